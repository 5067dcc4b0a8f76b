use crate::config::QueryPolicy;
use crate::db::catalog::{SchemaDescriptor, ALLOWED_TABLES};
use crate::llm::models::{ChatTurn, Role};
use regex::Regex;

/// Builds the system instruction handed to the generation backend: the
/// allow-listed schema as pretty JSON plus the fixed rule block.
pub fn system_prompt(schema: &SchemaDescriptor, policy: QueryPolicy) -> String {
    let schema_json =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".to_string());

    let verb_rule = match policy {
        QueryPolicy::ReadOnly => "Only SELECT queries",
        QueryPolicy::ReadWrite => {
            "Generate SELECT, UPDATE, INSERT, or DELETE queries as appropriate for the user's request"
        }
    };

    format!(
        "You are a database assistant for DuckDB. Generate SQL queries. Whenever you \
         encounter a foreign key, resolve to the referenced table. Here is the schema:\n\
         {}\n\n\
         Rules:\n\
         1. {}\n\
         2. Only these tables: {}\n\
         3. Use DuckDB syntax (LIMIT instead of TOP, etc.)\n\
         4. Wrap SQL in ```sql``` blocks",
        schema_json,
        verb_rule,
        ALLOWED_TABLES.join(", ")
    )
}

/// Merges the client-carried history with the new user message. History order
/// is preserved; the new message always comes last.
pub fn build_prompt(history: &[ChatTurn], message: &str) -> Vec<ChatTurn> {
    let mut turns = history.to_vec();
    turns.push(ChatTurn {
        role: Role::User,
        content: message.to_string(),
    });
    turns
}

/// Pulls the candidate SQL out of a model reply: the first fenced code block
/// explicitly labeled `sql`, trimmed. One extraction attempt per reply; a
/// reply with no such fence is a plain informational answer.
pub fn extract_query(reply: &str) -> Option<String> {
    let fence = Regex::new(r"```sql\n([\s\S]*?)```").unwrap();
    fence
        .captures(reply)
        .map(|captures| captures[1].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_order_is_preserved_and_message_comes_last() {
        let history = vec![
            ChatTurn {
                role: Role::User,
                content: "first".to_string(),
            },
            ChatTurn {
                role: Role::Assistant,
                content: "second".to_string(),
            },
        ];

        let turns = build_prompt(&history, "third");
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].content, "first");
        assert_eq!(turns[1].content, "second");
        assert_eq!(turns[2].content, "third");
        assert_eq!(turns[2].role, Role::User);
    }

    #[test]
    fn empty_history_yields_a_single_user_turn() {
        let turns = build_prompt(&[], "hello");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
    }

    #[test]
    fn fence_round_trips_its_interior() {
        let query = "SELECT * FROM Items\nWHERE Id = 1";
        let reply = format!("Sure thing:\n```sql\n{}\n```\nLet me know!", query);
        assert_eq!(extract_query(&reply).as_deref(), Some(query));
    }

    #[test]
    fn only_the_first_sql_fence_is_extracted() {
        let reply = "```sql\nSELECT 1\n```\nor maybe\n```sql\nSELECT 2\n```";
        assert_eq!(extract_query(reply).as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn reply_without_fence_yields_no_query() {
        assert_eq!(extract_query("The Items table holds inventory."), None);
    }

    #[test]
    fn unlabeled_fence_is_not_a_query() {
        let reply = "```\nSELECT 1\n```";
        assert_eq!(extract_query(reply), None);
    }

    #[test]
    fn fence_without_newline_after_tag_is_malformed() {
        assert_eq!(extract_query("```sql SELECT 1```"), None);
    }

    #[test]
    fn system_prompt_names_the_allowed_tables() {
        let prompt = system_prompt(&SchemaDescriptor::new(), QueryPolicy::ReadOnly);
        assert!(prompt.contains("Only SELECT queries"));
        assert!(prompt.contains("Items"));
        assert!(prompt.contains("```sql```"));
    }

    #[test]
    fn read_write_prompt_allows_modifying_verbs() {
        let prompt = system_prompt(&SchemaDescriptor::new(), QueryPolicy::ReadWrite);
        assert!(prompt.contains("UPDATE, INSERT, or DELETE"));
    }
}
