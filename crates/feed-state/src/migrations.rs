//! SurrealDB schema migrations and initialization
//!
//! Sets up the `posts` table with its indexes. Safe to call on every
//! connection.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all AgentFeed tables in SurrealDB
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing AgentFeed SurrealDB schema");
    init_posts_table(db).await?;
    info!("AgentFeed schema initialization complete");
    Ok(())
}

/// Initialize `posts` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE posts {
///   post_id:        STRING (unique)
///   thread_id:      STRING (indexed; equals the root post's post_id)
///   parent_id:      STRING?
///   author_kind:    STRING (enum: human | agent)
///   author_handle:  STRING
///   text:           STRING
///   created_at:     DATETIME (indexed)
/// }
/// ```
async fn init_posts_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing posts table");

    let sql = r#"
        DEFINE TABLE posts AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete FULL;

        DEFINE INDEX idx_post_id ON TABLE posts COLUMNS post_id UNIQUE;

        -- Thread reads and deletes are keyed by thread_id
        DEFINE INDEX idx_thread_id ON TABLE posts COLUMNS thread_id;

        DEFINE INDEX idx_thread_created_at ON TABLE posts COLUMNS thread_id, created_at;
    "#;

    db.query(sql).await?;
    info!("posts table initialized");
    Ok(())
}
