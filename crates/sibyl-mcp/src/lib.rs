//! sibyl MCP server library.
//!
//! Exposes the generative-AI tools and the sandboxed filesystem tools of
//! `sibyl-kernel` over MCP using rmcp.
//!
//! AI tools build a prompt, run it through the shared [`Generator`] and
//! return the text. Their `save_*` variants also write the text to a file in
//! the workspace. File tools delegate to [`FileTools`].

pub mod helpers;
pub mod models;

use std::sync::Arc;

use rmcp::{
    RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tokio_util::sync::CancellationToken;

use sibyl_kernel::file_tools::{
    EditParams, GrepParams, InfoParams, ListParams, MoveParams, ReadParams, SearchParams,
    TreeParams, WriteParams,
};
use sibyl_kernel::{FileTools, Generator, LlmResult, PromptPlan, prompts};

pub use models::*;
use helpers::*;

/// MCP server handler for sibyl.
#[derive(Clone)]
pub struct SibylMcp {
    generator: Arc<Generator>,
    files: Arc<FileTools>,
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for SibylMcp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SibylMcp")
            .field("generator", &self.generator)
            .field("files", &self.files)
            .finish()
    }
}

impl SibylMcp {
    pub fn new(generator: Arc<Generator>, files: Arc<FileTools>) -> Self {
        Self {
            generator,
            files,
            tool_router: Self::tool_router(),
        }
    }

    async fn generate(
        &self,
        plan: LlmResult<PromptPlan>,
        cancel: &CancellationToken,
    ) -> LlmResult<String> {
        let plan = plan?;
        let tools = plan.tools();
        self.generator.generate(plan.history, &tools, cancel).await
    }

    /// Run a prompt plan and return the generated text.
    async fn run_prompt(
        &self,
        plan: LlmResult<PromptPlan>,
        cancel: CancellationToken,
    ) -> ToolResult {
        match self.generate(plan, &cancel).await {
            Ok(text) => text_result(text),
            Err(e) => llm_failure(e),
        }
    }

    /// Run a prompt plan and write the generated text to `output_path`.
    ///
    /// The output path is validated before the model is called.
    async fn run_and_save(
        &self,
        plan: LlmResult<PromptPlan>,
        output_path: &str,
        cancel: CancellationToken,
    ) -> ToolResult {
        if let Err(e) = self.files.workspace().resolve(output_path) {
            return fs_failure(e);
        }
        let text = match self.generate(plan, &cancel).await {
            Ok(text) => text,
            Err(e) => return llm_failure(e),
        };
        match self.files.save(output_path, &text).await {
            Ok(_) => {
                tracing::info!(path = %output_path, bytes = text.len(), "Saved generated output");
                text_result(format!(
                    "Saved {} bytes of generated content to {}",
                    text.len(),
                    output_path
                ))
            }
            Err(e) => fs_failure(e),
        }
    }
}

#[tool_router]
impl SibylMcp {
    // ========================================================================
    // AI Tools
    // ========================================================================

    #[tool(description = "Answer a question using Google Search grounding for current information.")]
    #[tracing::instrument(skip_all, name = "mcp.answer_query_websearch")]
    async fn answer_query_websearch(
        &self,
        Parameters(req): Parameters<QueryRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_prompt(prompts::answer_query_websearch(&req.query), context.ct).await
    }

    #[tool(description = "Answer a question from the model's own knowledge, without web search.")]
    #[tracing::instrument(skip_all, name = "mcp.answer_query_direct")]
    async fn answer_query_direct(
        &self,
        Parameters(req): Parameters<QueryRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_prompt(prompts::answer_query_direct(&req.query), context.ct).await
    }

    #[tool(description = "Explain a topic or API, grounded in its official documentation via web search.")]
    #[tracing::instrument(skip_all, name = "mcp.explain_topic_with_docs")]
    async fn explain_topic_with_docs(
        &self,
        Parameters(req): Parameters<TopicQueryRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_prompt(prompts::explain_topic_with_docs(&req.topic, &req.query), context.ct)
            .await
    }

    #[tool(description = "Find precise code snippets from official documentation for a topic.")]
    #[tracing::instrument(skip_all, name = "mcp.get_doc_snippets")]
    async fn get_doc_snippets(
        &self,
        Parameters(req): Parameters<TopicQueryRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_prompt(prompts::get_doc_snippets(&req.topic, &req.query), context.ct).await
    }

    #[tool(description = "Generate coding guidelines and best practices for a technology stack.")]
    #[tracing::instrument(skip_all, name = "mcp.generate_project_guidelines")]
    async fn generate_project_guidelines(
        &self,
        Parameters(req): Parameters<GuidelinesRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_prompt(prompts::generate_project_guidelines(&req.tech_stack), context.ct)
            .await
    }

    // ========================================================================
    // AI Tools (save to file)
    // ========================================================================

    #[tool(description = "Answer a question with web search and save the answer to a workspace file.")]
    #[tracing::instrument(skip_all, name = "mcp.save_answer_query_websearch")]
    async fn save_answer_query_websearch(
        &self,
        Parameters(req): Parameters<SaveQueryRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_and_save(
            prompts::answer_query_websearch(&req.query),
            &req.output_path,
            context.ct,
        )
        .await
    }

    #[tool(description = "Answer a question without web search and save the answer to a workspace file.")]
    #[tracing::instrument(skip_all, name = "mcp.save_answer_query_direct")]
    async fn save_answer_query_direct(
        &self,
        Parameters(req): Parameters<SaveQueryRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_and_save(
            prompts::answer_query_direct(&req.query),
            &req.output_path,
            context.ct,
        )
        .await
    }

    #[tool(description = "Explain a topic from its official documentation and save the explanation to a workspace file.")]
    #[tracing::instrument(skip_all, name = "mcp.save_topic_explanation")]
    async fn save_topic_explanation(
        &self,
        Parameters(req): Parameters<SaveTopicQueryRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_and_save(
            prompts::explain_topic_with_docs(&req.topic, &req.query),
            &req.output_path,
            context.ct,
        )
        .await
    }

    #[tool(description = "Find documentation code snippets for a topic and save them to a workspace file.")]
    #[tracing::instrument(skip_all, name = "mcp.save_doc_snippet")]
    async fn save_doc_snippet(
        &self,
        Parameters(req): Parameters<SaveTopicQueryRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_and_save(
            prompts::get_doc_snippets(&req.topic, &req.query),
            &req.output_path,
            context.ct,
        )
        .await
    }

    #[tool(description = "Generate project guidelines for a technology stack and save them to a workspace file.")]
    #[tracing::instrument(skip_all, name = "mcp.save_generate_project_guidelines")]
    async fn save_generate_project_guidelines(
        &self,
        Parameters(req): Parameters<SaveGuidelinesRequest>,
        context: RequestContext<RoleServer>,
    ) -> ToolResult {
        self.run_and_save(
            prompts::generate_project_guidelines(&req.tech_stack),
            &req.output_path,
            context.ct,
        )
        .await
    }

    // ========================================================================
    // File Tools
    // ========================================================================

    #[tool(description = "Read one or more files. A single path returns the raw content; multiple paths return each file under a '--- path ---' header.")]
    async fn read_file_content(&self, Parameters(req): Parameters<ReadParams>) -> ToolResult {
        fs_result(self.files.read.execute(req).await)
    }

    #[tool(description = "Create or overwrite one or more files, creating parent directories as needed.")]
    async fn write_file_content(&self, Parameters(req): Parameters<WriteParams>) -> ToolResult {
        fs_result(self.files.write.execute(req).await)
    }

    #[tool(description = "Apply ordered text replacements to a file and return a unified diff. Matching tolerates indentation differences. Use dry_run to preview.")]
    async fn edit_file_content(&self, Parameters(req): Parameters<EditParams>) -> ToolResult {
        fs_result(self.files.edit.execute(req).await)
    }

    #[tool(description = "Recursively find files and directories whose name contains the pattern (case-insensitive) or matches it as a glob.")]
    async fn search_files(&self, Parameters(req): Parameters<SearchParams>) -> ToolResult {
        fs_result(self.files.search.execute(req).await)
    }

    #[tool(description = "Search file contents with a regular expression. Respects .gitignore. Returns file:line matches with optional context.")]
    async fn search_file_contents(&self, Parameters(req): Parameters<GrepParams>) -> ToolResult {
        fs_result(self.files.grep.execute(req).await)
    }

    #[tool(description = "List a directory, marking entries as [DIR] or [FILE].")]
    async fn list_directory_contents(&self, Parameters(req): Parameters<ListParams>) -> ToolResult {
        fs_result(self.files.list.execute(req).await)
    }

    #[tool(description = "Return a JSON tree of a directory with name, type and children for each entry.")]
    async fn get_directory_tree(&self, Parameters(req): Parameters<TreeParams>) -> ToolResult {
        fs_result(self.files.tree.execute(req).await)
    }

    #[tool(description = "Move or rename a file or directory. Fails if the destination exists.")]
    async fn move_file(&self, Parameters(req): Parameters<MoveParams>) -> ToolResult {
        fs_result(self.files.mv.execute(req).await)
    }

    #[tool(description = "Get size, type, permissions and timestamps of a file or directory.")]
    async fn get_file_info(&self, Parameters(req): Parameters<InfoParams>) -> ToolResult {
        fs_result(self.files.info.execute(req).await)
    }
}

#[tool_handler]
impl ServerHandler for SibylMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build()).with_instructions(
            format!(
                "sibyl MCP server. AI tools answer questions, explain documentation and write \
                 project guidelines using {} ({}); save_* variants write the result to a file. \
                 File tools read, write, edit and search files under the workspace root {}.",
                self.generator.provider_name(),
                self.generator.config().model_id,
                self.files.workspace().root().display(),
            ),
        )
    }
}
