//! # alm-connector - client for test-management REST servers
//!
//! `alm-connector` talks to test-management servers that expose generic,
//! server-defined entities over REST, authenticate through a single-sign-on
//! cookie handshake, and page their query results.
//!
//! ## Quick Start
//!
//! ```no_run
//! use alm_connector::{Session, RunStepBuilder, RunStepStatus, TestRunBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), alm_connector::Error> {
//!     // Runs the whole authentication handshake
//!     let session = Session::builder()
//!         .server_url("http://alm.example.com/qcbin")?
//!         .domain("DEFAULT")
//!         .project("Demo")
//!         .credentials("tester", "secret")
//!         .connect()
//!         .await?;
//!
//!     // Create a run and one step
//!     let run = TestRunBuilder::new()
//!         .name("nightly")
//!         .test_instance_id(17)
//!         .status("Passed")
//!         .create();
//!     let run = session.create_entity(&run).await?;
//!
//!     let step = RunStepBuilder::new()
//!         .test_run_id(run.id()?)
//!         .name("Login")
//!         .status(RunStepStatus::Passed)
//!         .create();
//!     session.create_entity(&step).await?;
//!
//!     // Iterate a large result as if it were one sequence
//!     let tests = session.query_entities("test", Some("name['Login*']")).await?;
//!     println!("{} matching tests", tests.total_count());
//!     let mut cursor = tests.cursor();
//!     while let Some(test) = cursor.try_next().await? {
//!         println!("{}: {}", test.id()?, test.string_value("name")?);
//!     }
//!
//!     session.logout().await
//! }
//! ```
//!
//! ## Features
//!
//! - **Guarded sessions** - a [`Session`] exists only after the full handshake succeeded
//! - **Generic entities** - [`Entity`] is a typed field bag with parse-on-read accessors
//! - **Snapshot builders** - [`EntityBuilder`] and typed builders hand out independent copies
//! - **Transparent paging** - [`PagedEntityCollection`] fetches pages on demand
//! - **Typed failures** - server error bodies become [`Error::Server`] with title and code
//! - **Pluggable transport** - anything implementing [`Transport`] can carry the requests
//! - **Structured logging** - requests and session lifecycle are traced with `tracing`
//!
//! ## Error Handling
//!
//! ```no_run
//! use alm_connector::{Entity, Error, Session};
//!
//! # async fn example(session: &Session, run: &Entity) -> Result<(), Error> {
//! match session.create_entity(run).await {
//!     Ok(created) => println!("Created {}", created.id()?),
//!     Err(Error::Server { title, code, .. }) => {
//!         eprintln!("Rejected: {:?} ({:?})", title, code);
//!     }
//!     Err(e) if e.is_transport() => eprintln!("Network trouble: {}", e),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod collection;
pub mod connector;
mod entity;
mod error;
pub mod format;
pub mod helpers;
mod request;
mod response;
mod session;
mod transport;
mod wire;

pub use builder::{
    EntityBuilder, RunStepBuilder, RunStepStatus, TestInstanceBuilder, TestRunBuilder,
    TestSetBuilder, TestSetFolderBuilder,
};
pub use collection::{EntityCursor, PagedEntityCollection};
pub use connector::{Connector, CookieJar};
pub use entity::{Entity, Field, Fields};
pub use error::{Error, Result};
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use session::{
    encode_query, error_for_response, server_time_zone, Session, SessionBuilder, SessionConfig,
};
pub use transport::{ReqwestTransport, Transport};
pub use wire::{ResultSet, ServerError, ServerTime};
