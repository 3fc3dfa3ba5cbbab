// src/releases.rs

//! Known Debian releases
//!
//! Suites named after a release get its number and date recorded. Only
//! archived releases may be added as sticky suites from an archive mirror.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub codename: &'static str,
    pub version: &'static str,
    /// `YYYY-MM-DD`
    pub date: &'static str,
    /// Moved to archive.debian.org
    pub archived: bool,
}

impl Release {
    pub fn release_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date, "%Y-%m-%d").ok()
    }
}

const fn release(
    codename: &'static str,
    version: &'static str,
    date: &'static str,
    archived: bool,
) -> Release {
    Release {
        codename,
        version,
        date,
        archived,
    }
}

pub const DEBIAN_RELEASES: &[Release] = &[
    release("buzz", "1.1", "1996-06-17", true),
    release("rex", "1.2", "1996-12-12", true),
    release("bo", "1.3", "1997-06-05", true),
    release("hamm", "2.0", "1998-07-24", true),
    release("slink", "2.1", "1999-03-09", true),
    release("potato", "2.2", "2000-08-15", true),
    release("woody", "3.0", "2002-07-19", true),
    release("sarge", "3.1", "2005-06-06", true),
    release("etch", "4.0", "2007-04-08", true),
    release("lenny", "5.0", "2009-02-15", true),
    release("squeeze", "6.0", "2011-02-06", true),
    release("wheezy", "7", "2013-05-04", true),
    release("jessie", "8", "2015-04-25", true),
    release("stretch", "9", "2017-06-17", false),
    release("buster", "10", "2019-07-06", false),
];

/// Release metadata for a suite name
pub fn lookup(suite: &str) -> Option<&'static Release> {
    DEBIAN_RELEASES.iter().find(|r| r.codename == suite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let woody = lookup("woody").unwrap();
        assert_eq!(woody.version, "3.0");
        assert!(woody.archived);
        assert_eq!(
            woody.release_date(),
            NaiveDate::from_ymd_opt(2002, 7, 19)
        );
        assert!(!lookup("buster").unwrap().archived);
        assert!(lookup("sid").is_none());
    }

    #[test]
    fn test_dates_parse() {
        for release in DEBIAN_RELEASES {
            assert!(release.release_date().is_some(), "{}", release.codename);
        }
    }
}
