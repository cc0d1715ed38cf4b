/// Pull a candidate SQL string out of an LLM completion.
///
/// First looks for a fenced ` ```sql ... ``` ` block; failing that, finds
/// a leading `SELECT ...` or `WITH ... SELECT ...` statement. Returns
/// `None` if neither is present — the caller treats that as a validation
/// error and retries.
pub fn extract_sql(text: &str) -> Option<String> {
    if let Some(sql) = extract_fenced_sql_block(text) {
        if !sql.trim().is_empty() {
            return Some(sql.trim().to_string());
        }
    }
    extract_leading_statement(text)
}

fn extract_fenced_sql_block(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let start_marker = lower.find("```sql")?;
    let body_start = start_marker + "```sql".len();
    let rest = &text[body_start..];
    let rest_lower = &lower[body_start..];
    let end = rest_lower.find("```")?;
    Some(rest[..end].to_string())
}

fn extract_leading_statement(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let select_pos = lower.find("select");
    let with_pos = lower.find("with");

    let start = match (select_pos, with_pos) {
        (Some(s), Some(w)) => s.min(w),
        (Some(s), None) => s,
        (None, Some(w)) => w,
        (None, None) => return None,
    };

    let candidate = text[start..].trim();
    if candidate.is_empty() {
        return None;
    }
    Some(candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_sql_block() {
        let text = "Here you go:\n```sql\nSELECT COUNT(*) FROM profiles\n```\nHope that helps.";
        assert_eq!(
            extract_sql(text),
            Some("SELECT COUNT(*) FROM profiles".to_string())
        );
    }

    #[test]
    fn falls_back_to_leading_select() {
        let text = "SELECT * FROM profiles LIMIT 5";
        assert_eq!(extract_sql(text), Some(text.to_string()));
    }

    #[test]
    fn falls_back_to_leading_with_cte() {
        let text = "WITH recent AS (SELECT * FROM profiles) SELECT * FROM recent";
        assert_eq!(extract_sql(text), Some(text.to_string()));
    }

    #[test]
    fn returns_none_when_nothing_extractable() {
        assert_eq!(extract_sql("I cannot answer that question."), None);
    }

    #[test]
    fn prefers_fenced_block_over_prose_mentioning_select() {
        let text = "You could use a SELECT here, but here is the real query:\n```sql\nSELECT 1\n```";
        assert_eq!(extract_sql(text), Some("SELECT 1".to_string()));
    }
}
