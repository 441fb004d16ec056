pub mod expr;
pub mod rules;
pub mod statement;
pub(crate) mod util;

pub use expr::{Condition, EvaluationError, ExprError};
pub use rules::{CategorizationConfig, CategoryRule, CategoryRuleEngine, ConfigError, MatchType, Rule};
pub use statement::{parse_statement, read_statement, StatementError};
