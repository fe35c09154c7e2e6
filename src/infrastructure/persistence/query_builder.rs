/// Shared SQL fragments
pub struct QueryBuilder;

impl QueryBuilder {
    pub const VIOLATION_SELECT: &'static str = r#"
        SELECT id, rate_key, identifier, user_agent, occurred_at
        FROM rate_limit_violations
    "#;

    /// Scope to one (identifier, action) pair, bound as $1 and $2
    pub const ATTEMPT_PAIR_WHERE: &'static str = "WHERE identifier = $1 AND action = $2";
}
