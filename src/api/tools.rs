use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{PlatformError, PlatformResult};
use crate::logic::{BranchOperations, ProjectOperations};
use crate::model::Id;
use crate::store::Platform;

/// A callable tool as advertised to clients
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

fn descriptor(name: &'static str, description: &'static str, parameters: Value) -> ToolDescriptor {
    ToolDescriptor {
        name,
        description,
        parameters,
    }
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Every tool `call_tool` dispatches, in presentation order
pub fn catalogue() -> Vec<ToolDescriptor> {
    let project_id = || object(json!({"project_id": {"type": "string"}}), &["project_id"]);
    let branch_id = || object(json!({"branch_id": {"type": "string"}}), &["branch_id"]);

    vec![
        descriptor(
            "list_projects",
            "Lists all projects.",
            object(json!({}), &[]),
        ),
        descriptor(
            "get_project",
            "Gets details for a project, including its database host.",
            object(json!({"id": {"type": "string", "description": "The project ID"}}), &["id"]),
        ),
        descriptor(
            "create_project",
            "Creates a new project. The project starts as UNKNOWN and becomes ACTIVE_HEALTHY once its database is ready; use get_project to check the status.",
            object(
                json!({
                    "name": {"type": "string", "description": "The name of the project"},
                    "organization_id": {"type": "string"},
                    "region": {"type": "string", "description": "The region to create the project in. Defaults to the configured region."},
                }),
                &["name", "organization_id"],
            ),
        ),
        descriptor("pause_project", "Pauses a project.", project_id()),
        descriptor("restore_project", "Restores a paused project.", project_id()),
        descriptor(
            "list_organizations",
            "Lists all organizations.",
            object(json!({}), &[]),
        ),
        descriptor(
            "get_organization",
            "Gets details for an organization.",
            object(json!({"id": {"type": "string", "description": "The organization ID"}}), &["id"]),
        ),
        descriptor(
            "list_migrations",
            "Lists all migrations recorded for a project, oldest first.",
            project_id(),
        ),
        descriptor(
            "apply_migration",
            "Applies a migration to the database and records it. Use this when executing DDL operations.",
            object(
                json!({
                    "project_id": {"type": "string"},
                    "name": {"type": "string", "description": "The name of the migration in snake_case"},
                    "query": {"type": "string", "description": "The SQL query to apply"},
                }),
                &["project_id", "name", "query"],
            ),
        ),
        descriptor(
            "execute_sql",
            "Executes raw SQL in the project's database without recording a migration. Use apply_migration instead for DDL operations.",
            object(
                json!({
                    "project_id": {"type": "string"},
                    "query": {"type": "string", "description": "The SQL query to execute"},
                }),
                &["project_id", "query"],
            ),
        ),
        descriptor("get_project_url", "Gets the API URL for a project.", project_id()),
        descriptor(
            "create_branch",
            "Creates a development branch on a project. All migrations from the project are replayed onto a fresh branch database; data does not carry over. The branch gets its own project, referenced by project_ref, to run queries and migrations against.",
            object(
                json!({
                    "project_id": {"type": "string"},
                    "name": {"type": "string", "default": "develop", "description": "Name of the branch to create"},
                }),
                &["project_id"],
            ),
        ),
        descriptor(
            "list_branches",
            "Lists all development branches of a project, including status which can be polled to see when create, merge, rebase or reset complete.",
            project_id(),
        ),
        descriptor("delete_branch", "Deletes a development branch.", branch_id()),
        descriptor(
            "merge_branch",
            "Merges migrations from a development branch into its parent project.",
            branch_id(),
        ),
        descriptor(
            "reset_branch",
            "Resets migrations of a development branch. Any untracked data or schema changes will be lost.",
            object(
                json!({
                    "branch_id": {"type": "string"},
                    "migration_version": {"type": "string", "description": "Reset the branch to a specific migration version."},
                }),
                &["branch_id"],
            ),
        ),
        descriptor(
            "rebase_branch",
            "Rebases a development branch on its parent project, running the parent's migrations on the branch to handle migration drift.",
            branch_id(),
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct IdArgs {
    id: Id,
}

#[derive(Debug, Deserialize)]
struct ProjectArgs {
    project_id: Id,
}

#[derive(Debug, Deserialize)]
struct BranchArgs {
    branch_id: Id,
}

#[derive(Debug, Deserialize)]
struct CreateProjectArgs {
    name: String,
    organization_id: Id,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApplyMigrationArgs {
    project_id: Id,
    name: String,
    query: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteSqlArgs {
    project_id: Id,
    query: String,
}

#[derive(Debug, Deserialize)]
struct CreateBranchArgs {
    project_id: Id,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResetBranchArgs {
    branch_id: Id,
    migration_version: Option<String>,
}

fn parse<T: DeserializeOwned>(tool: &str, arguments: Value) -> PlatformResult<T> {
    // A missing body counts as no arguments
    let arguments = match arguments {
        Value::Null => json!({}),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|err| PlatformError::InvalidArguments {
        tool: tool.to_string(),
        message: err.to_string(),
    })
}

fn to_json<T: Serialize>(value: T) -> PlatformResult<Value> {
    serde_json::to_value(value).map_err(|err| PlatformError::ExecutionFailure {
        message: err.to_string(),
    })
}

/// Validate `arguments` for tool `name` and run it
pub async fn call_tool(platform: &Platform, name: &str, arguments: Value) -> PlatformResult<Value> {
    log::debug!("Calling tool {}", name);

    match name {
        "list_projects" => to_json(ProjectOperations::list_projects(platform)),
        "get_project" => {
            let args: IdArgs = parse(name, arguments)?;
            to_json(ProjectOperations::get_project(platform, &args.id)?)
        }
        "create_project" => {
            let args: CreateProjectArgs = parse(name, arguments)?;
            to_json(ProjectOperations::create_project(
                platform,
                args.name,
                args.organization_id,
                args.region,
            ))
        }
        "pause_project" => {
            let args: ProjectArgs = parse(name, arguments)?;
            to_json(ProjectOperations::pause_project(platform, &args.project_id)?)
        }
        "restore_project" => {
            let args: ProjectArgs = parse(name, arguments)?;
            to_json(ProjectOperations::restore_project(platform, &args.project_id)?)
        }
        "list_organizations" => to_json(ProjectOperations::list_organizations(platform)),
        "get_organization" => {
            let args: IdArgs = parse(name, arguments)?;
            to_json(ProjectOperations::get_organization(platform, &args.id)?)
        }
        "list_migrations" => {
            let args: ProjectArgs = parse(name, arguments)?;
            to_json(ProjectOperations::list_migrations(platform, &args.project_id)?)
        }
        "apply_migration" => {
            let args: ApplyMigrationArgs = parse(name, arguments)?;
            to_json(
                ProjectOperations::apply_migration(platform, &args.project_id, args.name, args.query)
                    .await?,
            )
        }
        "execute_sql" => {
            let args: ExecuteSqlArgs = parse(name, arguments)?;
            to_json(ProjectOperations::execute_sql(platform, &args.project_id, &args.query).await?)
        }
        "get_project_url" => {
            let args: ProjectArgs = parse(name, arguments)?;
            to_json(ProjectOperations::get_project_url(platform, &args.project_id)?)
        }
        "create_branch" => {
            let args: CreateBranchArgs = parse(name, arguments)?;
            let branch_name = args
                .name
                .unwrap_or_else(|| platform.config().default_branch_name.clone());
            to_json(BranchOperations::create_branch(platform, &args.project_id, &branch_name).await?)
        }
        "list_branches" => {
            let args: ProjectArgs = parse(name, arguments)?;
            to_json(BranchOperations::list_branches(platform, &args.project_id))
        }
        "delete_branch" => {
            let args: BranchArgs = parse(name, arguments)?;
            to_json(BranchOperations::delete_branch(platform, &args.branch_id).await?)
        }
        "merge_branch" => {
            let args: BranchArgs = parse(name, arguments)?;
            to_json(BranchOperations::merge_branch(platform, &args.branch_id).await?)
        }
        "reset_branch" => {
            let args: ResetBranchArgs = parse(name, arguments)?;
            to_json(
                BranchOperations::reset_branch(
                    platform,
                    &args.branch_id,
                    args.migration_version.as_deref(),
                )
                .await?,
            )
        }
        "rebase_branch" => {
            let args: BranchArgs = parse(name, arguments)?;
            to_json(BranchOperations::rebase_branch(platform, &args.branch_id).await?)
        }
        _ => Err(PlatformError::UnknownTool {
            name: name.to_string(),
        }),
    }
}
