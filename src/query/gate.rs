use crate::db::executor::ExecutionResult;
use crate::query::classifier::Classification;

/// Fixed result stub attached to refused write queries.
pub const WRITE_REFUSAL_ERROR: &str = "Query not executed: Modifying queries (UPDATE, INSERT, \
     DELETE) are not automatically executed for safety reasons.";

/// Outcome of gating a classified query.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// The query may be handed to the executor verbatim.
    Execute(String),
    /// The query must not run. `message`, when present, replaces the
    /// assistant's prose; `result` is the stub returned in place of real
    /// query output.
    Refuse {
        message: Option<String>,
        result: ExecutionResult,
    },
}

/// Maps a classification to an execute/refuse decision.
///
/// Writes are never executed, regardless of deployment policy; the refusal
/// embeds the query verbatim so an operator can run it manually through a
/// controlled interface. Pure function, no retained state.
pub fn gate(classification: &Classification, candidate: &str) -> GateDecision {
    match classification {
        Classification::Read => GateDecision::Execute(candidate.to_string()),
        Classification::Write => GateDecision::Refuse {
            message: Some(write_refusal_message(candidate)),
            result: ExecutionResult::failure(WRITE_REFUSAL_ERROR),
        },
        Classification::Rejected(violation) => GateDecision::Refuse {
            message: None,
            result: ExecutionResult::failure(violation.message()),
        },
    }
}

fn write_refusal_message(candidate: &str) -> String {
    format!(
        "I'm sorry, Dave, I can't do that, but here is the query:\n\n```sql\n{}\n```\n\n\
         This query would modify the database, so it won't be executed automatically. \
         If you need to run this query, please execute it manually through a secure \
         database management interface.",
        candidate
    )
}
