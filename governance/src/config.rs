//! Organization bootstrap configuration with TOML file support.
//!
//! ```toml
//! members = ["alice", "bob"]
//!
//! [rules]
//! addNewEmployee = { kind = "member_only" }
//! issueTokens = { kind = "by_vote" }
//! openProposal = { kind = "caller_only", principal = "auto-proposer" }
//!
//! [tokens]
//! supply_cap = 1000000
//!
//! [logging]
//! format = "json"
//! level = "info"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use guild_tokens::TokenLedger;
use guild_types::{EngineId, Principal, TokenAmount};
use guild_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::action::ActionName;
use crate::engine::GovernanceEngine;
use crate::error::GovernanceError;
use crate::registry::{AuthorizationRule, PolicyRegistry, QuorumSource};

/// TOML form of an [`AuthorizationRule`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    MemberOnly,
    CallerOnly {
        principal: Principal,
    },
    ByVote {
        #[serde(default = "default_quorum")]
        quorum: String,
    },
}

impl From<&RuleConfig> for AuthorizationRule {
    fn from(rule: &RuleConfig) -> Self {
        match rule {
            RuleConfig::MemberOnly => AuthorizationRule::MemberOnly,
            RuleConfig::CallerOnly { principal } => AuthorizationRule::CallerOnly(principal.clone()),
            RuleConfig::ByVote { quorum } => AuthorizationRule::ByVote(QuorumSource::new(quorum)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "human" or "json".
    #[serde(default)]
    pub format: LogFormat,

    /// Filter directive, e.g. "info" or "debug,guild_governance=trace".
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokensConfig {
    /// Maximum total issuance; unlimited when absent.
    #[serde(default)]
    pub supply_cap: Option<u64>,
}

/// Bootstrap configuration for one organization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrgConfig {
    /// Founding members.
    #[serde(default)]
    pub members: Vec<Principal>,

    /// Action name → rule. Names must be built-in action names.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,

    #[serde(default)]
    pub tokens: TokensConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_quorum() -> String {
    QuorumSource::MEMBERS.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

// ── Impl ───────────────────────────────────────────────────────────────

impl OrgConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, GovernanceError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GovernanceError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GovernanceError> {
        toml::from_str(s).map_err(|e| GovernanceError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, GovernanceError> {
        toml::to_string_pretty(self).map_err(|e| GovernanceError::Config(e.to_string()))
    }

    /// Build an unsealed registry holding the configured roster and rules.
    pub fn build_registry(&self) -> Result<PolicyRegistry, GovernanceError> {
        let mut registry = PolicyRegistry::new();
        for (name, rule) in &self.rules {
            let action = ActionName::new(name.as_str());
            if !action.is_known() {
                return Err(GovernanceError::Config(format!("unknown action name: {name}")));
            }
            registry.set_rule(action, AuthorizationRule::from(rule))?;
        }
        for member in &self.members {
            registry.add_member(member.clone())?;
        }
        Ok(registry)
    }

    /// Build the reference balance ledger.
    pub fn build_token_ledger(&self) -> TokenLedger {
        match self.tokens.supply_cap {
            Some(cap) => TokenLedger::with_supply_cap(TokenAmount::new(u128::from(cap))),
            None => TokenLedger::new(),
        }
    }

    /// Bootstrap the registry and ledger and hand both to a new engine.
    pub fn build_engine(
        &self,
        id: EngineId,
    ) -> Result<(GovernanceEngine, Arc<TokenLedger>), GovernanceError> {
        let ledger = Arc::new(self.build_token_ledger());
        let engine = GovernanceEngine::new(id, self.build_registry()?, ledger.clone())?;
        Ok((engine, ledger))
    }

    /// Install the global tracing subscriber described by `[logging]`.
    pub fn init_logging(&self) -> Result<(), GovernanceError> {
        guild_utils::try_init_logging(self.logging.format, &self.logging.level)
            .map_err(|e| GovernanceError::Config(format!("logging: {e}")))
    }
}
