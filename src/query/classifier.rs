use crate::config::QueryPolicy;

/// Keywords whose presence anywhere in a candidate query disqualifies it.
///
/// The scan is a plain substring match over the uppercased text. It is not a
/// parser: it has no notion of SQL syntax, comments, or string-literal
/// boundaries, so `SELECT * FROM Items WHERE Name = 'UPDATE'` is rejected
/// even though the literal is harmless. That false-positive is the accepted
/// cost of keeping the filter trivial to audit.
pub const DANGEROUS_KEYWORDS: [&str; 11] = [
    "DROP",
    "DELETE",
    "INSERT",
    "UPDATE",
    "ALTER",
    "CREATE",
    "TRUNCATE",
    "EXEC",
    "EXECUTE",
    "GRANT",
    "REVOKE",
];

/// Leading verbs recognized as writes under `QueryPolicy::ReadWrite`.
const WRITE_VERBS: [&str; 3] = ["UPDATE", "INSERT", "DELETE"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The candidate does not start with SELECT (after uppercasing/trim).
    NotSelect,
    /// A deny-listed keyword occurs somewhere in the candidate text.
    ForbiddenKeyword(&'static str),
}

impl Violation {
    pub fn message(&self) -> String {
        match self {
            Violation::NotSelect => "Only SELECT queries are allowed".to_string(),
            Violation::ForbiddenKeyword(keyword) => {
                format!("Keyword \"{}\" is not allowed", keyword)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Read,
    Write,
    Rejected(Violation),
}

/// Classifies a candidate query string as read, write, or rejected.
///
/// Pure function of the candidate text and the deployment policy. The prefix
/// check runs first, so a non-SELECT in read-only mode is reported as
/// `NotSelect` even when it also contains deny-listed keywords.
pub fn classify(candidate: &str, policy: QueryPolicy) -> Classification {
    let upper = candidate.to_uppercase();
    let upper = upper.trim();

    if !upper.starts_with("SELECT") {
        match policy {
            QueryPolicy::ReadOnly => return Classification::Rejected(Violation::NotSelect),
            QueryPolicy::ReadWrite => {
                let Some(verb) = WRITE_VERBS.iter().find(|v| upper.starts_with(**v)) else {
                    return Classification::Rejected(Violation::NotSelect);
                };

                // A write is expected to contain its own verb; any other
                // deny-listed keyword is still disqualifying.
                for keyword in DANGEROUS_KEYWORDS {
                    if keyword != *verb && upper.contains(keyword) {
                        return Classification::Rejected(Violation::ForbiddenKeyword(keyword));
                    }
                }

                return Classification::Write;
            }
        }
    }

    for keyword in DANGEROUS_KEYWORDS {
        if upper.contains(keyword) {
            return Classification::Rejected(Violation::ForbiddenKeyword(keyword));
        }
    }

    Classification::Read
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_select_is_read() {
        let c = classify("SELECT TOP 10 * FROM Items", QueryPolicy::ReadOnly);
        assert_eq!(c, Classification::Read);
    }

    #[test]
    fn lowercase_and_whitespace_are_normalized() {
        let c = classify("  select name from Residents  ", QueryPolicy::ReadOnly);
        assert_eq!(c, Classification::Read);
    }

    #[test]
    fn non_select_rejected_in_read_only_mode() {
        let c = classify("DELETE FROM Items", QueryPolicy::ReadOnly);
        assert_eq!(c, Classification::Rejected(Violation::NotSelect));
    }

    #[test]
    fn prefix_violation_wins_over_keyword_scan() {
        // DELETE is also deny-listed, but the missing SELECT prefix is the
        // reported reason in read-only mode.
        let c = classify("DELETE FROM Items WHERE Id = 1", QueryPolicy::ReadOnly);
        assert_eq!(c, Classification::Rejected(Violation::NotSelect));
    }

    #[test]
    fn keyword_inside_string_literal_still_rejects() {
        // Documented lexical false-positive: the scan is not aware of
        // string-literal boundaries.
        let c = classify(
            "SELECT * FROM Items WHERE Name = 'UPDATE'",
            QueryPolicy::ReadOnly,
        );
        assert_eq!(
            c,
            Classification::Rejected(Violation::ForbiddenKeyword("UPDATE"))
        );
    }

    #[test]
    fn select_with_embedded_drop_rejects() {
        let c = classify("SELECT 1; DROP TABLE Items", QueryPolicy::ReadOnly);
        assert_eq!(
            c,
            Classification::Rejected(Violation::ForbiddenKeyword("DROP"))
        );
    }

    #[test]
    fn leading_write_verbs_classify_as_write_in_read_write_mode() {
        for sql in [
            "UPDATE Items SET Name = 'x' WHERE Id = 1",
            "INSERT INTO Items (Name) VALUES ('x')",
            "DELETE FROM Items WHERE Id = 1",
        ] {
            assert_eq!(classify(sql, QueryPolicy::ReadWrite), Classification::Write);
        }
    }

    #[test]
    fn write_with_other_deny_keyword_rejects_in_read_write_mode() {
        let c = classify(
            "UPDATE Items SET Name = 'x'; DROP TABLE Items",
            QueryPolicy::ReadWrite,
        );
        assert_eq!(
            c,
            Classification::Rejected(Violation::ForbiddenKeyword("DROP"))
        );
    }

    #[test]
    fn unknown_leading_verb_rejects_in_read_write_mode() {
        let c = classify("TRUNCATE TABLE Items", QueryPolicy::ReadWrite);
        assert_eq!(c, Classification::Rejected(Violation::NotSelect));
    }

    #[test]
    fn select_with_deny_keyword_rejects_in_read_write_mode() {
        let c = classify(
            "SELECT * FROM Items WHERE Note = 'GRANT'",
            QueryPolicy::ReadWrite,
        );
        assert_eq!(
            c,
            Classification::Rejected(Violation::ForbiddenKeyword("GRANT"))
        );
    }

    #[test]
    fn classification_is_idempotent() {
        let sql = "SELECT * FROM Transactions";
        let first = classify(sql, QueryPolicy::ReadOnly);
        let second = classify(sql, QueryPolicy::ReadOnly);
        assert_eq!(first, second);
    }
}
