//! Which routes are logged, and to which channel.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::Error;
use crate::router::RouteId;

/// Channel used when neither the handler nor its group names one.
pub const DEFAULT_CHANNEL: &str = "access";

/// Per-request policy outcome, resolved once before any work is done.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogDecision {
    /// Not logged: nothing is captured, timed, or written.
    Skip,
    /// Logged to `channel`.
    Log { channel: String },
}

/// Decides, per route, whether requests are logged.
///
/// Implemented by [`PolicyTable`] and by any `Fn(&RouteId) -> LogDecision`.
pub trait RouteLogPolicy: Send + Sync + 'static {
    fn decide(&self, route: &RouteId) -> LogDecision;
}

impl<F> RouteLogPolicy for F
where
    F: Fn(&RouteId) -> LogDecision + Send + Sync + 'static,
{
    fn decide(&self, route: &RouteId) -> LogDecision {
        self(route)
    }
}

/// A logging setting at one scope. Unset fields defer to the wider scope.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Rule {
    pub log: Option<bool>,
    pub channel: Option<String>,
}

impl Rule {
    pub fn enabled() -> Self {
        Self { log: Some(true), channel: None }
    }

    pub fn disabled() -> Self {
        Self { log: Some(false), channel: None }
    }

    /// Sets the channel, leaving `log` as is.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// Route-registration table mapping route identity to a [`LogDecision`].
///
/// Rules exist at two scopes. A handler rule overrides its group's rule
/// field by field:
///
/// - `log`: handler, else group, else off
/// - `channel`: handler, else group, else the table's default channel
///
/// ```rust
/// use loupe::middleware::access_log::{LogDecision, PolicyTable, RouteLogPolicy, Rule};
/// use loupe::RouteId;
///
/// let policy = PolicyTable::new()
///     .group("UserController", Rule::enabled().channel("users"))
///     .handler("UserController", "list_users", Rule::disabled());
///
/// assert_eq!(
///     policy.decide(&RouteId::new("UserController", "get_user")),
///     LogDecision::Log { channel: "users".into() },
/// );
/// assert_eq!(policy.decide(&RouteId::new("UserController", "list_users")), LogDecision::Skip);
/// ```
#[derive(Clone, Debug)]
pub struct PolicyTable {
    default_channel: String,
    groups: HashMap<String, Rule>,
    handlers: HashMap<RouteId, Rule>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self {
            default_channel: DEFAULT_CHANNEL.to_owned(),
            groups: HashMap::new(),
            handlers: HashMap::new(),
        }
    }

    pub fn default_channel(mut self, channel: impl Into<String>) -> Self {
        self.default_channel = channel.into();
        self
    }

    /// Set the rule for every handler in `group`. Replaces any earlier rule.
    pub fn group(mut self, group: impl Into<String>, rule: Rule) -> Self {
        self.groups.insert(group.into(), rule);
        self
    }

    /// Set the rule for one handler. Replaces any earlier rule.
    pub fn handler(mut self, group: impl Into<String>, handler: impl Into<String>, rule: Rule) -> Self {
        self.handlers.insert(RouteId::new(group, handler), rule);
        self
    }

    /// Loads a table from TOML:
    ///
    /// ```toml
    /// default_channel = "access"
    ///
    /// [[rule]]
    /// group = "UserController"
    /// log = true
    /// channel = "users"
    ///
    /// [[rule]]
    /// group = "UserController"
    /// handler = "list_users"
    /// log = false
    /// ```
    ///
    /// A rule without `handler` applies to the whole group.
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        let file: PolicyFile = toml::from_str(source)?;
        let mut table = Self::new();
        if let Some(channel) = file.default_channel {
            table = table.default_channel(channel);
        }
        for entry in file.rule {
            let rule = Rule { log: entry.log, channel: entry.channel };
            table = match entry.handler {
                Some(handler) => table.handler(entry.group, handler, rule),
                None => table.group(entry.group, rule),
            };
        }
        Ok(table)
    }
}

impl Default for PolicyTable {
    fn default() -> Self { Self::new() }
}

impl RouteLogPolicy for PolicyTable {
    fn decide(&self, route: &RouteId) -> LogDecision {
        let handler = self.handlers.get(route);
        let group = self.groups.get(&route.group);

        let log = handler.and_then(|r| r.log)
            .or_else(|| group.and_then(|r| r.log))
            .unwrap_or(false);
        if !log {
            return LogDecision::Skip;
        }

        let channel = handler.and_then(|r| r.channel.as_deref())
            .or_else(|| group.and_then(|r| r.channel.as_deref()))
            .unwrap_or(&self.default_channel);
        LogDecision::Log { channel: channel.to_owned() }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyFile {
    default_channel: Option<String>,
    #[serde(default)]
    rule: Vec<RuleEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    group: String,
    handler: Option<String>,
    log: Option<bool>,
    channel: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(group: &str, handler: &str) -> RouteId {
        RouteId::new(group, handler)
    }

    fn log_to(channel: &str) -> LogDecision {
        LogDecision::Log { channel: channel.to_owned() }
    }

    #[test]
    fn unknown_routes_are_skipped() {
        assert_eq!(PolicyTable::new().decide(&route("Any", "thing")), LogDecision::Skip);
    }

    #[test]
    fn group_rule_covers_its_handlers() {
        let policy = PolicyTable::new().group("UserController", Rule::enabled().channel("UserController"));
        assert_eq!(policy.decide(&route("UserController", "get_user")), log_to("UserController"));
        assert_eq!(policy.decide(&route("OrderController", "get_order")), LogDecision::Skip);
    }

    #[test]
    fn handler_rule_takes_precedence() {
        let policy = PolicyTable::new()
            .group("UserController", Rule::disabled().channel("users"))
            .handler("UserController", "get_user", Rule::enabled());
        assert_eq!(policy.decide(&route("UserController", "get_user")), log_to("users"));
        assert_eq!(policy.decide(&route("UserController", "list_users")), LogDecision::Skip);

        let policy = PolicyTable::new()
            .group("UserController", Rule::enabled())
            .handler("UserController", "get_user", Rule::default().channel("lookups"));
        assert_eq!(policy.decide(&route("UserController", "get_user")), log_to("lookups"));
    }

    #[test]
    fn missing_channel_falls_back_to_default() {
        let policy = PolicyTable::new().handler("Ops", "ping", Rule::enabled());
        assert_eq!(policy.decide(&route("Ops", "ping")), log_to(DEFAULT_CHANNEL));

        let policy = policy.default_channel("ops");
        assert_eq!(policy.decide(&route("Ops", "ping")), log_to("ops"));
    }

    #[test]
    fn closures_are_policies() {
        let policy = |route: &RouteId| {
            if route.group == "Admin" { LogDecision::Skip } else { log_to(&route.group) }
        };
        assert_eq!(policy.decide(&route("Admin", "reset")), LogDecision::Skip);
        assert_eq!(policy.decide(&route("Shop", "checkout")), log_to("Shop"));
    }

    #[test]
    fn loads_from_toml() {
        let policy = PolicyTable::from_toml(
            r#"
            default_channel = "http"

            [[rule]]
            group = "UserController"
            log = true
            channel = "users"

            [[rule]]
            group = "UserController"
            handler = "list_users"
            log = false

            [[rule]]
            group = "Ops"
            handler = "ping"
            log = true
            "#,
        )
        .unwrap();

        assert_eq!(policy.decide(&route("UserController", "get_user")), log_to("users"));
        assert_eq!(policy.decide(&route("UserController", "list_users")), LogDecision::Skip);
        assert_eq!(policy.decide(&route("Ops", "ping")), log_to("http"));
    }

    #[test]
    fn malformed_toml_is_a_policy_error() {
        let err = PolicyTable::from_toml("[[rule]]\nlog = true\n").unwrap_err();
        assert!(matches!(err, Error::Policy(_)), "{err}");

        let err = PolicyTable::from_toml("[[rule]]\ngroup = \"A\"\nverbose = true\n").unwrap_err();
        assert!(matches!(err, Error::Policy(_)), "{err}");
    }
}
