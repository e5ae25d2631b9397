//! Builders that assemble entities field by field.
//!
//! [`EntityBuilder`] holds two slots: the working entity that setters
//! mutate, and the last snapshot handed out by [`EntityBuilder::create`].
//! `create` never gives away the working entity; it returns a deep copy, so
//! values carry forward into the next snapshot until overwritten, and no
//! snapshot is ever touched by later setter calls.
//!
//! The typed builders ([`TestRunBuilder`], [`RunStepBuilder`], ...) wrap an
//! `EntityBuilder` and expose the fields the server expects for their type.

use crate::entity::Entity;
use crate::format::{format_date, format_integer, format_time};
use chrono::{DateTime, TimeZone};

/// Generic builder for entities of one type.
///
/// # Examples
///
/// ```
/// use alm_connector::EntityBuilder;
///
/// let mut builder = EntityBuilder::new("defect");
/// builder.set_value("name", "Crash on save");
/// let first = builder.create();
///
/// builder.set_value("severity", "2-Medium");
/// let second = builder.create();
///
/// assert!(first.first_value("severity").is_none());
/// assert_eq!(second.string_value("name").unwrap(), "Crash on save");
/// ```
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    working: Entity,
    last_snapshot: Option<Entity>,
}

impl EntityBuilder {
    /// Creates a builder for entities of `entity_type`.
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            working: Entity::new(entity_type),
            last_snapshot: None,
        }
    }

    pub fn entity_type(&self) -> &str {
        self.working.entity_type()
    }

    /// Sets `name` to the single value `value`.
    ///
    /// An existing field keeps its position and gets its value list
    /// replaced; otherwise a new field is appended.
    pub fn set_value(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.working.set_value(name, value);
        self
    }

    /// Sets `name` to an integer rendered without grouping.
    pub fn set_integer(&mut self, name: &str, value: i64) -> &mut Self {
        self.set_value(name, format_integer(value))
    }

    /// Sets `name` to the `yyyy-MM-dd` rendering of `instant`.
    pub fn set_date<Tz: TimeZone>(&mut self, name: &str, instant: &DateTime<Tz>) -> &mut Self {
        self.set_value(name, format_date(instant))
    }

    /// Sets `name` to the `HH:mm:ss` rendering of `instant`.
    pub fn set_time<Tz: TimeZone>(&mut self, name: &str, instant: &DateTime<Tz>) -> &mut Self {
        self.set_value(name, format_time(instant))
    }

    /// Returns an independent snapshot of the current state.
    ///
    /// Calling `create` twice without mutation in between yields two equal
    /// but distinct entities.
    pub fn create(&mut self) -> Entity {
        let snapshot = self.working.clone();
        self.last_snapshot = Some(snapshot.clone());
        snapshot
    }

    /// The state captured by the most recent [`create`](Self::create) call.
    pub fn last_snapshot(&self) -> Option<&Entity> {
        self.last_snapshot.as_ref()
    }
}

/// Run step outcomes, with the display name the server stores in `status`
/// and the logical name used by its list definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStepStatus {
    Blocked,
    Failed,
    NotApplicable,
    NoRun,
    NotCompleted,
    Passed,
}

impl RunStepStatus {
    pub fn display_name(self) -> &'static str {
        match self {
            RunStepStatus::Blocked => "Blocked",
            RunStepStatus::Failed => "Failed",
            RunStepStatus::NotApplicable => "N/A",
            RunStepStatus::NoRun => "No Run",
            RunStepStatus::NotCompleted => "Not Completed",
            RunStepStatus::Passed => "Passed",
        }
    }

    pub fn logical_name(self) -> &'static str {
        match self {
            RunStepStatus::Blocked => "hp.qc.status.blocked",
            RunStepStatus::Failed => "hp.qc.status.failed",
            RunStepStatus::NotApplicable => "hp.qc.status.n-a",
            RunStepStatus::NoRun => "hp.qc.status.no-run",
            RunStepStatus::NotCompleted => "hp.qc.status.not-completed",
            RunStepStatus::Passed => "hp.qc.status.passed",
        }
    }
}

impl std::fmt::Display for RunStepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Builds `run` entities.
#[derive(Debug, Clone)]
pub struct TestRunBuilder {
    inner: EntityBuilder,
}

impl TestRunBuilder {
    pub const ENTITY_TYPE: &'static str = "run";

    pub fn new() -> Self {
        let mut inner = EntityBuilder::new(Self::ENTITY_TYPE);
        // The server offers no automated run subtype.
        inner.set_value("subtype-id", "hp.qc.run.MANUAL");
        Self { inner }
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.inner.set_value("name", name);
        self
    }

    /// Links the run to its test instance. The server reads either field
    /// depending on version, so both are set.
    pub fn test_instance_id(&mut self, id: i64) -> &mut Self {
        self.inner.set_integer("testcycl-id", id);
        self.inner.set_integer("test-instance", id);
        self
    }

    pub fn test_set_id(&mut self, id: i64) -> &mut Self {
        self.inner.set_integer("cycle-id", id);
        self
    }

    pub fn test_id(&mut self, id: i64) -> &mut Self {
        self.inner.set_integer("test-id", id);
        self
    }

    pub fn subtype_id(&mut self, subtype: &str) -> &mut Self {
        self.inner.set_value("subtype-id", subtype);
        self
    }

    pub fn status(&mut self, status: &str) -> &mut Self {
        self.inner.set_value("status", status);
        self
    }

    pub fn owner(&mut self, owner: &str) -> &mut Self {
        self.inner.set_value("owner", owner);
        self
    }

    pub fn host(&mut self, host: &str) -> &mut Self {
        self.inner.set_value("host", host);
        self
    }

    pub fn comments(&mut self, comments: &str) -> &mut Self {
        self.inner.set_value("comments", comments);
        self
    }

    /// Run duration in seconds.
    pub fn duration(&mut self, seconds: i64) -> &mut Self {
        self.inner.set_integer("duration", seconds);
        self
    }

    pub fn execution_date_time<Tz: TimeZone>(&mut self, instant: &DateTime<Tz>) -> &mut Self {
        self.inner.set_date("execution-date", instant);
        self.inner.set_time("execution-time", instant);
        self
    }

    pub fn os_info(&mut self, name: &str, build: &str, service_pack: &str) -> &mut Self {
        self.inner.set_value("os-name", name);
        self.inner.set_value("os-build", build);
        self.inner.set_value("os-sp", service_pack);
        self
    }

    pub fn create(&mut self) -> Entity {
        self.inner.create()
    }
}

impl Default for TestRunBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds `run-step` entities.
#[derive(Debug, Clone)]
pub struct RunStepBuilder {
    inner: EntityBuilder,
}

impl RunStepBuilder {
    pub const ENTITY_TYPE: &'static str = "run-step";

    pub fn new() -> Self {
        Self {
            inner: EntityBuilder::new(Self::ENTITY_TYPE),
        }
    }

    pub fn test_run_id(&mut self, run_id: i64) -> &mut Self {
        self.inner.set_integer("parent-id", run_id);
        self
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.inner.set_value("name", name);
        self
    }

    pub fn status(&mut self, status: RunStepStatus) -> &mut Self {
        self.inner.set_value("status", status.display_name());
        self
    }

    pub fn execution_date_time<Tz: TimeZone>(&mut self, instant: &DateTime<Tz>) -> &mut Self {
        self.inner.set_date("execution-date", instant);
        self.inner.set_time("execution-time", instant);
        self
    }

    pub fn description(&mut self, description: &str) -> &mut Self {
        self.inner.set_value("description", description);
        self
    }

    pub fn create(&mut self) -> Entity {
        self.inner.create()
    }
}

impl Default for RunStepBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds `test-instance` entities.
#[derive(Debug, Clone)]
pub struct TestInstanceBuilder {
    inner: EntityBuilder,
}

impl TestInstanceBuilder {
    pub const ENTITY_TYPE: &'static str = "test-instance";

    pub fn new() -> Self {
        let mut inner = EntityBuilder::new(Self::ENTITY_TYPE);
        inner.set_value("subtype-id", "hp.qc.test-instance.MANUAL");
        Self { inner }
    }

    pub fn test_set_id(&mut self, id: i64) -> &mut Self {
        self.inner.set_integer("cycle-id", id);
        self
    }

    pub fn test_id(&mut self, id: i64) -> &mut Self {
        self.inner.set_integer("test-id", id);
        self
    }

    pub fn test_config_id(&mut self, id: i64) -> &mut Self {
        self.inner.set_integer("test-config-id", id);
        self
    }

    pub fn order_number(&mut self, order: i64) -> &mut Self {
        self.inner.set_integer("test-order", order);
        self
    }

    pub fn status(&mut self, status: &str) -> &mut Self {
        self.inner.set_value("status", status);
        self
    }

    /// Copies `exec-date` and `exec-time` from another entity, typically a run.
    pub fn exec_date_time_from(&mut self, entity: &Entity) -> crate::Result<&mut Self> {
        let date = entity.string_value("exec-date")?.to_string();
        let time = entity.string_value("exec-time")?.to_string();
        self.inner.set_value("exec-date", date);
        self.inner.set_value("exec-time", time);
        Ok(self)
    }

    pub fn create(&mut self) -> Entity {
        self.inner.create()
    }
}

impl Default for TestInstanceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds `test-set` entities.
#[derive(Debug, Clone)]
pub struct TestSetBuilder {
    inner: EntityBuilder,
}

impl TestSetBuilder {
    pub const ENTITY_TYPE: &'static str = "test-set";

    pub fn new() -> Self {
        let mut inner = EntityBuilder::new(Self::ENTITY_TYPE);
        inner.set_value("subtype-id", "hp.qc.test-set.default");
        Self { inner }
    }

    pub fn parent_id(&mut self, folder_id: i64) -> &mut Self {
        self.inner.set_integer("parent-id", folder_id);
        self
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.inner.set_value("name", name);
        self
    }

    pub fn subtype_id(&mut self, subtype: &str) -> &mut Self {
        self.inner.set_value("subtype-id", subtype);
        self
    }

    pub fn create(&mut self) -> Entity {
        self.inner.create()
    }
}

impl Default for TestSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds `test-set-folder` entities.
#[derive(Debug, Clone)]
pub struct TestSetFolderBuilder {
    inner: EntityBuilder,
}

impl TestSetFolderBuilder {
    pub const ENTITY_TYPE: &'static str = "test-set-folder";

    pub fn new() -> Self {
        Self {
            inner: EntityBuilder::new(Self::ENTITY_TYPE),
        }
    }

    pub fn parent_id(&mut self, folder_id: i64) -> &mut Self {
        self.inner.set_integer("parent-id", folder_id);
        self
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.inner.set_value("name", name);
        self
    }

    pub fn create(&mut self) -> Entity {
        self.inner.create()
    }
}

impl Default for TestSetFolderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
