//! The compiled-in tool catalog.

use mcp::{ParamType, ParameterSpec, ToolDescriptor, ToolRegistry};

pub const OPEN_APPLICATION: &str = "open_application";
pub const GET_RUNNING_APPLICATIONS: &str = "get_running_applications";
pub const RUN_APPLESCRIPT: &str = "run_applescript";
pub const QUIT_APPLICATION: &str = "quit_application";
pub const OPEN_FILE_WITH_APP: &str = "open_file_with_app";
pub const OLLAMA_GENERATE: &str = "ollama_generate";
pub const OLLAMA_LIST_MODELS: &str = "ollama_list_models";
pub const MONGODB_CREATE_DATABASE: &str = "mongodb_create_database";
pub const MONGODB_LIST_DATABASES: &str = "mongodb_list_databases";
pub const MONGODB_CREATE_COLLECTION: &str = "mongodb_create_collection";
pub const MONGODB_LIST_COLLECTIONS: &str = "mongodb_list_collections";
pub const MONGODB_DELETE_COLLECTION: &str = "mongodb_delete_collection";
pub const MONGODB_INSERT_DOCUMENT: &str = "mongodb_insert_document";
pub const MONGODB_FIND_DOCUMENTS: &str = "mongodb_find_documents";
pub const MONGODB_DELETE_DOCUMENT: &str = "mongodb_delete_document";
pub const SEARCH_GOOGLE_IN_SAFARI: &str = "search_google_in_safari";

pub const DEFAULT_MODEL: &str = "llama3.2";

fn string(name: &str, description: &str) -> ParameterSpec {
    ParameterSpec::required(name, ParamType::String, description)
}

fn database() -> ParameterSpec {
    string("databaseName", "Database name")
}

fn collection(description: &str) -> ParameterSpec {
    string("collectionName", description)
}

/// Every tool, in the order shown to users and models.
pub fn tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            OPEN_APPLICATION,
            "Opens an application on Mac by name. Examples: 'Safari', 'Finder', 'TextEdit', 'Calculator'",
        )
        .param(string(
            "appName",
            "Application name to launch (e.g., 'Safari', 'Calculator')",
        )),
        ToolDescriptor::new(
            GET_RUNNING_APPLICATIONS,
            "Gets list of all running applications on Mac",
        ),
        ToolDescriptor::new(
            RUN_APPLESCRIPT,
            "Executes AppleScript command in specified application. Useful for automating actions in applications",
        )
        .param(string("appName", "Application name (e.g., 'Safari', 'Finder')"))
        .param(string("script", "AppleScript command to execute")),
        ToolDescriptor::new(QUIT_APPLICATION, "Closes specified application")
            .param(string("appName", "Application name to close")),
        ToolDescriptor::new(OPEN_FILE_WITH_APP, "Opens file or URL in specified application")
            .param(string("path", "Path to file or URL"))
            .param(string("appName", "Application name to open file with")),
        ToolDescriptor::new(
            OLLAMA_GENERATE,
            "Generates response using local Ollama model. Use for tasks requiring AI text processing",
        )
        .param(
            ParameterSpec::optional(
                "model",
                ParamType::String,
                "Ollama model name (e.g., 'llama3.2', 'deepseek-r1:8b'). Default 'llama3.2'",
            )
            .with_default(DEFAULT_MODEL),
        )
        .param(string("prompt", "Prompt for the model")),
        ToolDescriptor::new(OLLAMA_LIST_MODELS, "Gets list of available Ollama models"),
        ToolDescriptor::new(MONGODB_CREATE_DATABASE, "Creates new database in MongoDB")
            .param(database()),
        ToolDescriptor::new(MONGODB_LIST_DATABASES, "Gets list of all databases in MongoDB"),
        ToolDescriptor::new(
            MONGODB_CREATE_COLLECTION,
            "Creates new collection in specified database",
        )
        .param(database())
        .param(collection("Collection name")),
        ToolDescriptor::new(
            MONGODB_LIST_COLLECTIONS,
            "Gets list of collections in specified database",
        )
        .param(database()),
        ToolDescriptor::new(MONGODB_DELETE_COLLECTION, "Deletes collection from database")
            .param(database())
            .param(collection("Collection name to delete")),
        ToolDescriptor::new(MONGODB_INSERT_DOCUMENT, "Inserts document into collection")
            .param(database())
            .param(collection("Collection name"))
            .param(string("document", "JSON string with document to insert")),
        ToolDescriptor::new(MONGODB_FIND_DOCUMENTS, "Finds documents in collection")
            .param(database())
            .param(collection("Collection name"))
            .param(ParameterSpec::optional(
                "filter",
                ParamType::String,
                "JSON string with search filter (optional)",
            ))
            .param(
                ParameterSpec::optional(
                    "limit",
                    ParamType::Number,
                    "Maximum number of documents (default 100)",
                )
                .with_default(100i64),
            ),
        ToolDescriptor::new(
            MONGODB_DELETE_DOCUMENT,
            "Deletes document(s) from collection by filter",
        )
        .param(database())
        .param(collection("Collection name"))
        .param(string("filter", "JSON string with deletion filter")),
        ToolDescriptor::new(
            SEARCH_GOOGLE_IN_SAFARI,
            "Performs Google search through Safari browser",
        )
        .param(string("query", "Search query for Google")),
    ]
}

/// The catalog as a registry.
pub fn registry() -> mcp::Result<ToolRegistry> {
    ToolRegistry::new(tools())
}
