use pesa_core::{validate_account_name, AccountNameError, CategorizedTransaction, Money, Transaction};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::expr::{Condition, ExprError};
use crate::util::closest_match;

/// A rule as written in the rules file. Validated into a [`Rule`] by
/// [`CategoryRuleEngine::new`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryRule {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub account: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategorizationConfig {
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub rules: Vec<CategoryRule>,
    #[serde(default)]
    pub default_account: Option<String>,
}

impl CategorizationConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(strip_bom(content))
            .map_err(|e| ConfigError::Parse(format!("Failed to parse JSON: {e}")))
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(strip_bom(content))
            .map_err(|e| ConfigError::Parse(format!("Failed to parse TOML: {e}")))
    }
}

fn strip_bom(content: &str) -> &str {
    content.strip_prefix('\u{feff}').unwrap_or(content)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// At least one keyword must occur in the description.
    #[default]
    Any,
    /// Every keyword must occur in the description.
    All,
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(MatchType::Any),
            "all" => Ok(MatchType::All),
            other => Err(format!("Unknown match type: '{other}'")),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Any => write!(f, "any"),
            MatchType::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0}")]
    Parse(String),
    #[error("Configuration must contain at least one rule")]
    NoRules,
    #[error("Missing required field in config: default_account")]
    MissingDefaultAccount,
    #[error("Rule {rule} has no keywords")]
    EmptyKeywords { rule: usize },
    #[error("Rule {rule} has an empty entry in '{field}'")]
    EmptyFragment { rule: usize, field: &'static str },
    #[error("Rule {rule} has invalid match_type '{value}'. Must be 'any' or 'all'.")]
    UnknownMatchType { rule: usize, value: String },
    #[error("Rule {rule} has an invalid condition '{condition}': {source}")]
    InvalidCondition {
        rule: usize,
        condition: String,
        source: ExprError,
    },
    #[error("Rule {rule} is missing 'account' field")]
    MissingAccount { rule: usize },
    #[error("Rule {rule} account '{account}' is not a valid ledger account: {source}")]
    InvalidRuleAccount {
        rule: usize,
        account: String,
        source: AccountNameError,
    },
    #[error("'{account}' is not a valid ledger account: {source}")]
    InvalidAccount {
        account: String,
        source: AccountNameError,
    },
    #[error(
        "Rule {rule} uses account '{account}' which is not in accounts list{}",
        hint(.suggestion)
    )]
    UndeclaredRuleAccount {
        rule: usize,
        account: String,
        suggestion: Option<String>,
    },
    #[error("default_account '{account}' is not in accounts list{}", hint(.suggestion))]
    UndeclaredDefaultAccount {
        account: String,
        suggestion: Option<String>,
    },
}

fn hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

/// A validated rule. Keyword and exclude fragments are stored lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    position: usize,
    keywords: Vec<String>,
    match_type: MatchType,
    condition: Option<Condition>,
    exclude: Vec<String>,
    account: String,
}

impl Rule {
    fn compile(position: usize, raw: CategoryRule) -> Result<Self, ConfigError> {
        if raw.keywords.is_empty() {
            return Err(ConfigError::EmptyKeywords { rule: position });
        }
        let keywords = lower_fragments(position, "keywords", raw.keywords)?;
        let exclude = lower_fragments(position, "exclude", raw.exclude)?;

        let match_type = match raw.match_type {
            Some(value) => value
                .parse::<MatchType>()
                .map_err(|_| ConfigError::UnknownMatchType { rule: position, value })?,
            None => MatchType::default(),
        };

        let condition = match raw.condition {
            Some(source) if !source.trim().is_empty() => Some(
                Condition::parse(&source).map_err(|e| ConfigError::InvalidCondition {
                    rule: position,
                    condition: source.clone(),
                    source: e,
                })?,
            ),
            _ => None,
        };

        let account = raw
            .account
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or(ConfigError::MissingAccount { rule: position })?;
        validate_account_name(&account).map_err(|source| ConfigError::InvalidRuleAccount {
            rule: position,
            account: account.clone(),
            source,
        })?;

        Ok(Rule { position, keywords, match_type, condition, exclude, account })
    }

    /// Zero-based position of the rule in the rules file.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.matches_lowered(&tx.description.to_lowercase(), tx.amount)
    }

    /// Exclude veto, then keywords, then condition. `description` must
    /// already be lowercased.
    fn matches_lowered(&self, description: &str, amount: Money) -> bool {
        if self.exclude.iter().any(|fragment| description.contains(fragment.as_str())) {
            return false;
        }

        let hit = |keyword: &String| description.contains(keyword.as_str());
        let keywords_pass = match self.match_type {
            MatchType::Any => self.keywords.iter().any(hit),
            MatchType::All => self.keywords.iter().all(hit),
        };
        if !keywords_pass {
            return false;
        }

        let Some(condition) = &self.condition else {
            return true;
        };
        match condition.evaluate(amount.amount()) {
            Ok(passed) => passed,
            Err(err) => {
                tracing::warn!(
                    rule = self.position,
                    condition = %condition,
                    %amount,
                    "condition could not be evaluated, treating as false: {err}"
                );
                false
            }
        }
    }
}

fn lower_fragments(
    rule: usize,
    field: &'static str,
    fragments: Vec<String>,
) -> Result<Vec<String>, ConfigError> {
    fragments
        .into_iter()
        .map(|f| {
            if f.trim().is_empty() {
                Err(ConfigError::EmptyFragment { rule, field })
            } else {
                Ok(f.to_lowercase())
            }
        })
        .collect()
}

/// Ordered decision list: the first matching rule wins, otherwise the
/// default account. Rules are kept exactly in authored order.
#[derive(Debug, Clone)]
pub struct CategoryRuleEngine {
    accounts: Vec<String>,
    rules: Vec<Rule>,
    default_account: String,
}

impl CategoryRuleEngine {
    pub fn new(config: CategorizationConfig) -> Result<Self, ConfigError> {
        if config.rules.is_empty() {
            return Err(ConfigError::NoRules);
        }

        let default_account = config
            .default_account
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or(ConfigError::MissingDefaultAccount)?;
        validate_account_name(&default_account).map_err(|source| ConfigError::InvalidAccount {
            account: default_account.clone(),
            source,
        })?;

        let accounts: Vec<String> = config.accounts.iter().map(|a| a.trim().to_string()).collect();
        for account in &accounts {
            validate_account_name(account).map_err(|source| ConfigError::InvalidAccount {
                account: account.clone(),
                source,
            })?;
        }

        let rules = config
            .rules
            .into_iter()
            .enumerate()
            .map(|(position, raw)| Rule::compile(position, raw))
            .collect::<Result<Vec<_>, _>>()?;

        if !accounts.is_empty() {
            if !accounts.contains(&default_account) {
                return Err(ConfigError::UndeclaredDefaultAccount {
                    suggestion: closest_match(&default_account, &accounts).map(str::to_string),
                    account: default_account,
                });
            }
            if let Some(rule) = rules.iter().find(|r| !accounts.contains(&r.account)) {
                return Err(ConfigError::UndeclaredRuleAccount {
                    rule: rule.position,
                    account: rule.account.clone(),
                    suggestion: closest_match(&rule.account, &accounts).map(str::to_string),
                });
            }
        }

        tracing::info!(
            "Configuration validated: {} accounts, {} rules",
            accounts.len(),
            rules.len()
        );

        Ok(Self { accounts, rules, default_account })
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Self::new(CategorizationConfig::from_json(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Self::new(CategorizationConfig::from_toml(content)?)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Declared accounts, in authored order.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn default_account(&self) -> &str {
        &self.default_account
    }

    pub fn find_matching_rule(&self, tx: &Transaction) -> Option<&Rule> {
        let description = tx.description.to_lowercase();
        self.rules.iter().find(|rule| rule.matches_lowered(&description, tx.amount))
    }

    /// The account `tx` belongs to.
    pub fn categorize(&self, tx: &Transaction) -> &str {
        self.find_matching_rule(tx)
            .map_or(self.default_account.as_str(), Rule::account)
    }

    pub fn resolve(&self, transaction: Transaction) -> CategorizedTransaction {
        let rule = self.find_matching_rule(&transaction);
        let (account, rule_index) = match rule {
            Some(rule) => (rule.account.clone(), Some(rule.position)),
            None => (self.default_account.clone(), None),
        };
        tracing::debug!(
            date = %transaction.date,
            description = %transaction.description,
            rule = ?rule_index,
            "resolved to {account}"
        );
        CategorizedTransaction { transaction, account, rule_index }
    }

    /// Lazily resolves every transaction, preserving order.
    pub fn resolve_all<'a, I>(&'a self, transactions: I) -> impl Iterator<Item = CategorizedTransaction> + 'a
    where
        I: IntoIterator<Item = Transaction>,
        I::IntoIter: 'a,
    {
        transactions.into_iter().map(move |tx| self.resolve(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_tx(desc: &str, cents: i64) -> Transaction {
        Transaction::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), desc, Money::from_cents(cents))
    }

    fn make_rule(keywords: &[&str], account: &str) -> CategoryRule {
        CategoryRule {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            account: Some(account.to_string()),
            ..CategoryRule::default()
        }
    }

    fn engine(rules: Vec<CategoryRule>) -> CategoryRuleEngine {
        CategoryRuleEngine::new(CategorizationConfig {
            accounts: vec![],
            rules,
            default_account: Some("Expenses:Uncategorized".to_string()),
        })
        .unwrap()
    }

    fn config_error(rules: Vec<CategoryRule>) -> ConfigError {
        CategoryRuleEngine::new(CategorizationConfig {
            accounts: vec![],
            rules,
            default_account: Some("Expenses:Uncategorized".to_string()),
        })
        .unwrap_err()
    }

    // ── matching ──────────────────────────────────────────────────────────────

    #[test]
    fn transport_scenario() {
        let engine = engine(vec![make_rule(&["uber", "taxi"], "Expenses:Transport")]);
        assert_eq!(engine.categorize(&make_tx("Uber ride", 35000)), "Expenses:Transport");
        assert_eq!(engine.categorize(&make_tx("Grocery run", 20000)), "Expenses:Uncategorized");
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let engine = engine(vec![make_rule(&["KPLC"], "Expenses:Utilities")]);
        assert_eq!(engine.rules()[0].keywords(), ["kplc"]);
        assert_eq!(engine.categorize(&make_tx("Pay Bill to kplc prepaid", 100)), "Expenses:Utilities");
    }

    #[test]
    fn any_versus_all() {
        let any = engine(vec![make_rule(&["a", "b"], "Expenses:Any")]);
        let all = engine(vec![CategoryRule {
            match_type: Some("all".into()),
            ..make_rule(&["a", "b"], "Expenses:All")
        }]);
        let only_a = make_tx("xax", 100);
        let both = make_tx("xaxbx", 100);
        assert_eq!(any.categorize(&only_a), "Expenses:Any");
        assert_eq!(all.categorize(&only_a), "Expenses:Uncategorized");
        assert_eq!(all.categorize(&both), "Expenses:All");
    }

    #[test]
    fn match_type_is_case_insensitive() {
        let engine = engine(vec![CategoryRule {
            match_type: Some("ALL".into()),
            ..make_rule(&["a", "b"], "Expenses:All")
        }]);
        assert_eq!(engine.rules()[0].match_type(), MatchType::All);
    }

    #[test]
    fn exclude_scenario_falls_through() {
        let engine = engine(vec![
            CategoryRule { exclude: vec!["free".into()], ..make_rule(&["airtime"], "Expenses:Airtime") },
            make_rule(&["bonus"], "Income:Bonus"),
        ]);
        assert_eq!(engine.categorize(&make_tx("Airtime purchase", 10000)), "Expenses:Airtime");
        assert_eq!(engine.categorize(&make_tx("Free airtime bonus", 0)), "Income:Bonus");
        assert_eq!(engine.categorize(&make_tx("FREE AIRTIME", 0)), "Expenses:Uncategorized");
    }

    #[test]
    fn exclude_vetoes_regardless_of_match_type_and_condition() {
        for match_type in ["any", "all"] {
            let rule = Rule::compile(
                0,
                CategoryRule {
                    match_type: Some(match_type.into()),
                    condition: Some("amount > 0".into()),
                    exclude: vec!["reversal".into()],
                    ..make_rule(&["pay", "bill"], "Expenses:Bills")
                },
            )
            .unwrap();
            assert!(rule.matches(&make_tx("Pay Bill KPLC", 500)));
            assert!(!rule.matches(&make_tx("Pay Bill KPLC Reversal", 500)));
        }
    }

    #[test]
    fn condition_boundary() {
        let engine = engine(vec![CategoryRule {
            condition: Some("amount >= 1000".into()),
            ..make_rule(&["rent"], "Expenses:Rent")
        }]);
        assert_eq!(engine.categorize(&make_tx("Rent", 99999)), "Expenses:Uncategorized");
        assert_eq!(engine.categorize(&make_tx("Rent", 100000)), "Expenses:Rent");
        assert_eq!(engine.categorize(&make_tx("Rent", 100001)), "Expenses:Rent");
    }

    #[test]
    fn condition_sees_signed_amount() {
        let engine = engine(vec![CategoryRule {
            condition: Some("amount < 0".into()),
            ..make_rule(&["received"], "Income:Transfers")
        }]);
        assert_eq!(engine.categorize(&make_tx("Funds received from JOHN", -250000)), "Income:Transfers");
        assert_eq!(engine.categorize(&make_tx("Funds received from JOHN", 250000)), "Expenses:Uncategorized");
    }

    #[test]
    fn first_match_wins() {
        let engine = engine(vec![
            CategoryRule {
                condition: Some("amount > 5000".into()),
                ..make_rule(&["naivas"], "Expenses:Groceries:Bulk")
            },
            make_rule(&["naivas"], "Expenses:Groceries"),
        ]);
        assert_eq!(engine.categorize(&make_tx("NAIVAS WESTLANDS", 800000)), "Expenses:Groceries:Bulk");
        assert_eq!(engine.categorize(&make_tx("NAIVAS WESTLANDS", 30000)), "Expenses:Groceries");
    }

    #[test]
    fn authored_order_is_never_reordered() {
        // A general rule placed first shadows the specific one after it.
        let engine = engine(vec![
            make_rule(&["pay"], "Expenses:General"),
            make_rule(&["pay bill", "kplc"], "Expenses:Utilities"),
        ]);
        assert_eq!(engine.categorize(&make_tx("Pay Bill KPLC", 100)), "Expenses:General");
        assert_eq!(engine.rules()[0].position(), 0);
        assert_eq!(engine.rules()[1].position(), 1);
    }

    #[test]
    fn duplicate_rules_are_kept() {
        let engine = engine(vec![make_rule(&["x"], "Expenses:A"), make_rule(&["x"], "Expenses:A")]);
        assert_eq!(engine.rules().len(), 2);
    }

    #[test]
    fn categorize_is_deterministic() {
        let engine = engine(vec![
            CategoryRule {
                condition: Some("amount / 2 > 100".into()),
                ..make_rule(&["shop"], "Expenses:Shopping")
            },
            make_rule(&["shop"], "Expenses:Misc"),
        ]);
        let tx = make_tx("Shop at Carrefour", 20001);
        let first = engine.categorize(&tx).to_string();
        for _ in 0..50 {
            assert_eq!(engine.categorize(&tx), first);
        }
    }

    #[test]
    fn evaluation_error_only_skips_that_rule() {
        let engine = engine(vec![
            CategoryRule {
                condition: Some("100 / amount > 1".into()),
                ..make_rule(&["reversal"], "Expenses:Odd")
            },
            make_rule(&["reversal"], "Expenses:Reversals"),
        ]);
        assert_eq!(engine.categorize(&make_tx("Reversal", 0)), "Expenses:Reversals");
        assert_eq!(engine.categorize(&make_tx("Reversal", 5000)), "Expenses:Odd");
    }

    #[test]
    fn blank_condition_is_treated_as_absent() {
        let engine = engine(vec![CategoryRule {
            condition: Some("   ".into()),
            ..make_rule(&["uber"], "Expenses:Transport")
        }]);
        assert!(engine.rules()[0].condition().is_none());
        assert_eq!(engine.categorize(&make_tx("Uber", 1)), "Expenses:Transport");
    }

    #[test]
    fn resolve_records_rule_index() {
        let engine = engine(vec![make_rule(&["zzz"], "Expenses:Z"), make_rule(&["uber"], "Expenses:Transport")]);
        let hit = engine.resolve(make_tx("Uber", 100));
        assert_eq!(hit.account, "Expenses:Transport");
        assert_eq!(hit.rule_index, Some(1));
        let miss = engine.resolve(make_tx("Groceries", 100));
        assert!(miss.is_default());
        assert_eq!(miss.account, "Expenses:Uncategorized");
    }

    #[test]
    fn resolve_all_preserves_order() {
        let engine = engine(vec![make_rule(&["uber"], "Expenses:Transport")]);
        let out: Vec<_> = engine
            .resolve_all(vec![make_tx("b", 1), make_tx("Uber", 2), make_tx("a", 3)])
            .map(|c| c.transaction.description)
            .collect();
        assert_eq!(out, ["b", "Uber", "a"]);
    }

    // ── validation ────────────────────────────────────────────────────────────

    #[test]
    fn rejects_empty_rule_list() {
        assert_eq!(config_error(vec![]), ConfigError::NoRules);
    }

    #[test]
    fn rejects_missing_default_account() {
        let err = CategoryRuleEngine::new(CategorizationConfig {
            rules: vec![make_rule(&["x"], "Expenses:X")],
            ..CategorizationConfig::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::MissingDefaultAccount);
    }

    #[test]
    fn rejects_empty_keywords_with_rule_index() {
        let err = config_error(vec![make_rule(&["ok"], "Expenses:A"), make_rule(&[], "Expenses:B")]);
        assert_eq!(err, ConfigError::EmptyKeywords { rule: 1 });
        assert_eq!(err.to_string(), "Rule 1 has no keywords");
    }

    #[test]
    fn rejects_blank_fragments() {
        assert_eq!(
            config_error(vec![make_rule(&["ok", ""], "Expenses:A")]),
            ConfigError::EmptyFragment { rule: 0, field: "keywords" }
        );
        assert_eq!(
            config_error(vec![CategoryRule { exclude: vec![" ".into()], ..make_rule(&["ok"], "Expenses:A") }]),
            ConfigError::EmptyFragment { rule: 0, field: "exclude" }
        );
    }

    #[test]
    fn rejects_unknown_match_type() {
        let err = config_error(vec![CategoryRule { match_type: Some("most".into()), ..make_rule(&["x"], "Expenses:X") }]);
        assert_eq!(err, ConfigError::UnknownMatchType { rule: 0, value: "most".into() });
    }

    #[test]
    fn rejects_unsafe_condition_at_load_time() {
        let err = config_error(vec![
            make_rule(&["x"], "Expenses:X"),
            CategoryRule {
                condition: Some("__import__('os').system('rm -rf /')".into()),
                ..make_rule(&["y"], "Expenses:Y")
            },
        ]);
        assert!(matches!(
            err,
            ConfigError::InvalidCondition { rule: 1, source: ExprError::UnknownName { .. }, .. }
        ));
        assert!(err.to_string().starts_with("Rule 1 has an invalid condition"));
    }

    #[test]
    fn rejects_malformed_numeric_literal() {
        let err = config_error(vec![CategoryRule {
            condition: Some("amount > 1.2.3".into()),
            ..make_rule(&["x"], "Expenses:X")
        }]);
        assert!(matches!(err, ConfigError::InvalidCondition { source: ExprError::InvalidNumber { .. }, .. }));
    }

    #[test]
    fn rejects_missing_or_invalid_account() {
        let err = config_error(vec![CategoryRule { account: None, ..make_rule(&["x"], "") }]);
        assert_eq!(err, ConfigError::MissingAccount { rule: 0 });
        let err = config_error(vec![make_rule(&["x"], "   ")]);
        assert_eq!(err, ConfigError::MissingAccount { rule: 0 });
        let err = config_error(vec![make_rule(&["x"], "Expenses:Eating  Out")]);
        assert!(matches!(err, ConfigError::InvalidRuleAccount { rule: 0, source: AccountNameError::DoubleSpace, .. }));
    }

    #[test]
    fn declared_accounts_are_enforced_with_suggestion() {
        let err = CategoryRuleEngine::new(CategorizationConfig {
            accounts: vec!["Expenses:Transport".into(), "Expenses:Uncategorized".into()],
            rules: vec![make_rule(&["uber"], "Expenses:Trasport")],
            default_account: Some("Expenses:Uncategorized".into()),
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Rule 0 uses account 'Expenses:Trasport' which is not in accounts list (did you mean 'Expenses:Transport'?)"
        );
    }

    #[test]
    fn undeclared_default_account_is_rejected() {
        let err = CategoryRuleEngine::new(CategorizationConfig {
            accounts: vec!["Expenses:Transport".into()],
            rules: vec![make_rule(&["uber"], "Expenses:Transport")],
            default_account: Some("Expenses:Other".into()),
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredDefaultAccount { .. }));
    }

    // ── loading ───────────────────────────────────────────────────────────────

    #[test]
    fn loads_json_config() {
        let json = r#"{
            "accounts": ["Expenses:Transport", "Expenses:Airtime", "Expenses:Uncategorized"],
            "rules": [
                {"keywords": ["uber", "taxi"], "account": "Expenses:Transport"},
                {"keywords": ["airtime"], "exclude": ["free"], "match_type": "any",
                 "condition": "amount <= 1000", "account": "Expenses:Airtime"}
            ],
            "default_account": "Expenses:Uncategorized"
        }"#;
        let engine = CategoryRuleEngine::from_json(json).unwrap();
        assert_eq!(engine.rules().len(), 2);
        assert_eq!(engine.accounts().len(), 3);
        assert_eq!(engine.rules()[1].condition().unwrap().source(), "amount <= 1000");
        assert_eq!(engine.categorize(&make_tx("Airtime purchase", 5000)), "Expenses:Airtime");
    }

    #[test]
    fn loads_toml_config() {
        let toml = r#"
            accounts = []
            default_account = "Expenses:Uncategorized"

            [[rules]]
            keywords = ["uber"]
            account = "Expenses:Transport"

            [[rules]]
            keywords = ["naivas", "supermarket"]
            match_type = "all"
            account = "Expenses:Groceries"
        "#;
        let engine = CategoryRuleEngine::from_toml(toml).unwrap();
        assert_eq!(engine.rules()[1].match_type(), MatchType::All);
        assert_eq!(engine.default_account(), "Expenses:Uncategorized");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(CategoryRuleEngine::from_json("{ not json"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            CategoryRuleEngine::from_json(r#"{"rules": "nope", "default_account": "X"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn json_with_bom_loads() {
        let json = "\u{feff}{\"rules\":[{\"keywords\":[\"a\"],\"account\":\"Expenses:A\"}],\"default_account\":\"Expenses:B\"}";
        assert!(CategoryRuleEngine::from_json(json).is_ok());
    }
}
