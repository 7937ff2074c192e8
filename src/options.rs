//! Search options: one enumerated field per mutually exclusive group.
//!
//! The legacy flag word is still accepted through [`SearchOptions::from_flags`];
//! when conflicting bits are set the first-checked flag wins, exactly as the
//! flag-based API always behaved.

use serde::Serialize;

pub const RECURSE_DIRECTORIES: u64 = 0x1;
pub const RECURSE_MATCHED_DIRECTORIES: u64 = 0x2;
pub const MATCH_CASE_SENSITIVE: u64 = 0x4;
pub const MATCH_CASE_INSENSITIVE: u64 = 0x8;
pub const SORTED_BY_MODIFICATION_DATE: u64 = 0x10;
pub const SORTED_BY_FILENAME: u64 = 0x20;
pub const SORTED_BY_PATHNAME: u64 = 0x40;
pub const SORTED_BY_DESCENDING: u64 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RecursionMode {
    #[default]
    None,
    /// Descend into every directory; directories are never tested against patterns.
    All,
    /// Descend only into directories whose name matches a pattern.
    MatchedOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CaseMode {
    #[default]
    PlatformDefault,
    Sensitive,
    Insensitive,
}

impl CaseMode {
    pub fn ignore_case(self) -> bool {
        match self {
            CaseMode::Sensitive => false,
            CaseMode::Insensitive => true,
            CaseMode::PlatformDefault => cfg!(windows),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortKey {
    #[default]
    None,
    ModificationTime,
    FileName,
    PathName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SearchOptions {
    pub recursion: RecursionMode,
    pub case: CaseMode,
    pub sort: SortKey,
    pub direction: SortDirection,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recursion(mut self, recursion: RecursionMode) -> Self {
        self.recursion = recursion;
        self
    }

    pub fn case(mut self, case: CaseMode) -> Self {
        self.case = case;
        self
    }

    pub fn sorted_by(mut self, sort: SortKey, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn from_flags(flags: u64) -> Self {
        let recursion = if flags & RECURSE_DIRECTORIES != 0 {
            RecursionMode::All
        } else if flags & RECURSE_MATCHED_DIRECTORIES != 0 {
            RecursionMode::MatchedOnly
        } else {
            RecursionMode::None
        };

        let case = if flags & MATCH_CASE_SENSITIVE != 0 {
            CaseMode::Sensitive
        } else if flags & MATCH_CASE_INSENSITIVE != 0 {
            CaseMode::Insensitive
        } else {
            CaseMode::PlatformDefault
        };

        let sort = if flags & SORTED_BY_FILENAME != 0 {
            SortKey::FileName
        } else if flags & SORTED_BY_PATHNAME != 0 {
            SortKey::PathName
        } else if flags & SORTED_BY_MODIFICATION_DATE != 0 {
            SortKey::ModificationTime
        } else {
            SortKey::None
        };

        let direction = if flags & SORTED_BY_DESCENDING != 0 {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };

        Self {
            recursion,
            case,
            sort,
            direction,
        }
    }

    pub fn to_flags(&self) -> u64 {
        let mut flags = match self.recursion {
            RecursionMode::None => 0,
            RecursionMode::All => RECURSE_DIRECTORIES,
            RecursionMode::MatchedOnly => RECURSE_MATCHED_DIRECTORIES,
        };
        flags |= match self.case {
            CaseMode::PlatformDefault => 0,
            CaseMode::Sensitive => MATCH_CASE_SENSITIVE,
            CaseMode::Insensitive => MATCH_CASE_INSENSITIVE,
        };
        flags |= match self.sort {
            SortKey::None => 0,
            SortKey::ModificationTime => SORTED_BY_MODIFICATION_DATE,
            SortKey::FileName => SORTED_BY_FILENAME,
            SortKey::PathName => SORTED_BY_PATHNAME,
        };
        if self.direction == SortDirection::Descending {
            flags |= SORTED_BY_DESCENDING;
        }
        flags
    }

    pub fn ignore_case(&self) -> bool {
        self.case.ignore_case()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurse_all_wins_over_recurse_matched() {
        let opts = SearchOptions::from_flags(RECURSE_DIRECTORIES | RECURSE_MATCHED_DIRECTORIES);
        assert_eq!(opts.recursion, RecursionMode::All);
    }

    #[test]
    fn case_sensitive_wins_over_insensitive() {
        let opts = SearchOptions::from_flags(MATCH_CASE_SENSITIVE | MATCH_CASE_INSENSITIVE);
        assert_eq!(opts.case, CaseMode::Sensitive);
        assert!(!opts.ignore_case());
    }

    #[test]
    fn empty_flags_resolve_to_defaults() {
        let opts = SearchOptions::from_flags(0);
        assert_eq!(opts, SearchOptions::default());
        assert_eq!(opts.ignore_case(), cfg!(windows));
    }

    #[test]
    fn filename_sort_wins_over_pathname_and_mtime() {
        let opts = SearchOptions::from_flags(
            SORTED_BY_MODIFICATION_DATE | SORTED_BY_PATHNAME | SORTED_BY_FILENAME | SORTED_BY_DESCENDING,
        );
        assert_eq!(opts.sort, SortKey::FileName);
        assert_eq!(opts.direction, SortDirection::Descending);
    }

    #[test]
    fn to_flags_is_canonical() {
        let opts = SearchOptions::new()
            .recursion(RecursionMode::MatchedOnly)
            .case(CaseMode::Insensitive)
            .sorted_by(SortKey::PathName, SortDirection::Descending);
        let flags = opts.to_flags();
        assert_eq!(
            flags,
            RECURSE_MATCHED_DIRECTORIES | MATCH_CASE_INSENSITIVE | SORTED_BY_PATHNAME | SORTED_BY_DESCENDING
        );
        assert_eq!(SearchOptions::from_flags(flags), opts);
    }
}
