//! Higher-level lookups composed from session operations.
//!
//! These functions only use the public [`Session`] API; they encode common
//! workflows of test reporting tools (locating a folder path, finding or
//! creating a test set or test instance).

use crate::builder::{TestInstanceBuilder, TestSetBuilder, TestSetFolderBuilder};
use crate::entity::Entity;
use crate::format::format_integer;
use crate::session::Session;
use crate::{Error, Result};

const TEST_SET_FOLDER: &str = TestSetFolderBuilder::ENTITY_TYPE;
const TEST_SET: &str = TestSetBuilder::ENTITY_TYPE;
const TEST_INSTANCE: &str = TestInstanceBuilder::ENTITY_TYPE;

/// Ensures a test set folder path such as `Root/Nightly/UI` exists and
/// returns its last folder.
///
/// The first segment must name exactly one existing root folder. Missing
/// folders below it are created.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] for empty paths or empty segments, and
/// [`Error::UnexpectedMatchCount`] if a segment is ambiguous or the root
/// folder does not exist.
pub async fn create_test_set_folder_path(session: &Session, path: &str) -> Result<Entity> {
    let segments: Vec<&str> = path.split('/').collect();
    if path.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(Error::InvalidPath(path.to_string()));
    }

    let query = format!("name['{}']", segments[0]);
    let roots = session.query_entities(TEST_SET_FOLDER, Some(&query)).await?;
    if roots.total_count() != 1 {
        return Err(Error::UnexpectedMatchCount {
            entity_type: TEST_SET_FOLDER.to_string(),
            query,
            count: roots.total_count(),
        });
    }
    let mut current = roots.cursor().next_entity().await?;

    for segment in &segments[1..] {
        let query = format!(
            "name['{}']; parent-id[{}]",
            segment,
            format_integer(current.id()?)
        );
        let folders = session.query_entities(TEST_SET_FOLDER, Some(&query)).await?;
        current = match folders.total_count() {
            0 => {
                tracing::info!(segment = %segment, parent = current.id()?, "Creating test set folder");
                let folder = TestSetFolderBuilder::new()
                    .parent_id(current.id()?)
                    .name(segment)
                    .create();
                session.create_entity(&folder).await?
            }
            1 => folders.cursor().next_entity().await?,
            count => {
                return Err(Error::UnexpectedMatchCount {
                    entity_type: TEST_SET_FOLDER.to_string(),
                    query,
                    count,
                })
            }
        };
    }

    Ok(current)
}

/// Returns the test set named `name` in folder `folder_id`, creating it if
/// there is none.
pub async fn create_or_get_test_set(session: &Session, folder_id: i64, name: &str) -> Result<Entity> {
    let query = format!("parent-id[{}]; name['{}']", format_integer(folder_id), name);
    let sets = session.query_entities(TEST_SET, Some(&query)).await?;

    if sets.total_count() == 0 {
        let set = TestSetBuilder::new().parent_id(folder_id).name(name).create();
        return session.create_entity(&set).await;
    }

    let set = sets.cursor().next_entity().await?;
    Ok(set)
}

fn test_instance_query(test_set_id: i64, test_id: i64, test_config_id: Option<i64>) -> String {
    let mut query = format!(
        "cycle-id[{}]; test-id[{}]",
        format_integer(test_set_id),
        format_integer(test_id)
    );
    if let Some(config_id) = test_config_id {
        query.push_str(&format!("; test-config-id[{}]", format_integer(config_id)));
    }
    query
}

/// Returns the test instance of test `test_id` in test set `test_set_id`,
/// creating one ordered after all existing instances if there is none.
///
/// After creating, the instance is looked up again instead of trusting the
/// create response: the server may auto-generate more than one instance and
/// answer with an arbitrary one of them.
pub async fn create_or_get_test_instance(
    session: &Session,
    test_set_id: i64,
    test_id: i64,
    test_config_id: Option<i64>,
) -> Result<Entity> {
    let query = test_instance_query(test_set_id, test_id, test_config_id);
    let instances = session.query_entities(TEST_INSTANCE, Some(&query)).await?;
    if instances.total_count() > 0 {
        let instance = instances.cursor().next_entity().await?;
        return Ok(instance);
    }

    let siblings_query = format!("cycle-id[{}]", format_integer(test_set_id));
    let siblings = session
        .query_entities(TEST_INSTANCE, Some(&siblings_query))
        .await?;
    let mut max_order = 0;
    let mut cursor = siblings.cursor();
    while let Some(sibling) = cursor.try_next().await? {
        max_order = max_order.max(sibling.long_value("test-order")?);
    }

    let mut builder = TestInstanceBuilder::new();
    builder
        .test_set_id(test_set_id)
        .test_id(test_id)
        .order_number(max_order + 1);
    if let Some(config_id) = test_config_id {
        builder.test_config_id(config_id);
    }
    session.create_entity(&builder.create()).await?;

    let instances = session.query_entities(TEST_INSTANCE, Some(&query)).await?;
    if instances.total_count() == 0 {
        return Err(Error::UnexpectedMatchCount {
            entity_type: TEST_INSTANCE.to_string(),
            query,
            count: 0,
        });
    }
    let instance = instances.cursor().next_entity().await?;
    Ok(instance)
}
