//! End-to-end processing of one document.
//!
//! PDF pages → page selection → completion → parse → merge. Stages run one
//! after another; the index and completion stages each have a deadline.
//! Dropping the future returned by [`ExtractionPipeline::process_pages`]
//! cancels the request and tears down its page index.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, SmartxError};
use crate::extract::{ExtractionResult, FieldExtractor, PromptBuilder, ResponseParser, Stage};
use crate::index::{PageIndexer, SelectedPage, VectorStore};
use crate::llm::{CompletionBackend, Embedder};
use crate::models::config::{PdfConfig, SmartxConfig};
use crate::pdf::{PdfExtractor, PdfProcessor, PdfType};
use crate::schema::{MergeReport, SchemaTemplate, merge, transport_template};

/// Everything produced for one document.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// Zero-based index of the page used for extraction.
    pub page: usize,
    /// Similarity of that page to the retrieval topics.
    pub score: f32,
    #[serde(skip)]
    pub page_text: String,
    /// Completion text before parsing.
    #[serde(skip)]
    pub raw_response: String,
    pub stage: Stage,
    pub result: ExtractionResult,
    pub schema: SchemaTemplate,
    #[serde(skip)]
    pub report: MergeReport,
}

/// Runs the extraction stages for a document.
pub struct ExtractionPipeline {
    indexer: PageIndexer,
    extractor: FieldExtractor,
    parser: ResponseParser,
    template: SchemaTemplate,
    index_timeout: Duration,
    pdf: PdfConfig,
}

impl ExtractionPipeline {
    /// Pipeline merging into the built-in transport template.
    pub fn new(indexer: PageIndexer, extractor: FieldExtractor) -> Self {
        Self {
            indexer,
            extractor,
            parser: ResponseParser::new(),
            template: transport_template().clone(),
            index_timeout: Duration::from_secs(60),
            pdf: PdfConfig::default(),
        }
    }

    /// Build every stage from configuration.
    ///
    /// Loads the template from `schema.template_path` when one is set.
    pub fn from_config(
        config: &SmartxConfig,
        store: VectorStore,
        completion: Arc<dyn CompletionBackend>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let indexer = PageIndexer::new(store, embedder, config.retrieval.topics.clone())
            .with_strategy(config.retrieval.strategy)
            .with_results_per_query(config.retrieval.results_per_query);

        let extractor = FieldExtractor::new(completion)
            .with_prompt(PromptBuilder::new().with_max_page_chars(config.extraction.max_page_chars))
            .with_timeout(config.llm.completion_timeout());

        let template = match &config.schema.template_path {
            Some(path) => {
                debug!("Loading schema template from {}", path.display());
                SchemaTemplate::from_file(path)?
            }
            None => transport_template().clone(),
        };

        Ok(Self::new(indexer, extractor)
            .with_parser(ResponseParser::new().with_strict_types(config.extraction.strict_types))
            .with_template(template)
            .with_index_timeout(config.llm.index_timeout())
            .with_pdf_config(config.pdf.clone()))
    }

    pub fn with_parser(mut self, parser: ResponseParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_template(mut self, template: SchemaTemplate) -> Self {
        self.template = template;
        self
    }

    /// Deadline for building and querying the page index.
    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }

    pub fn with_pdf_config(mut self, pdf: PdfConfig) -> Self {
        self.pdf = pdf;
        self
    }

    pub fn template(&self) -> &SchemaTemplate {
        &self.template
    }

    /// Load a PDF and process its pages.
    pub async fn process_pdf(&self, data: &[u8]) -> Result<PipelineOutput> {
        let mut pdf = PdfExtractor::new();
        pdf.load(data)?;

        let content = pdf.extract_all(self.pdf.min_text_length)?;
        match content.pdf_type {
            PdfType::Empty => warn!("PDF has no extractable text"),
            PdfType::Sparse => warn!(
                "PDF has less than {} characters of text",
                self.pdf.min_text_length
            ),
            PdfType::Text => {}
        }

        let mut pages = content.page_texts();
        if self.pdf.max_pages > 0 && pages.len() > self.pdf.max_pages {
            debug!("Indexing first {} of {} pages", self.pdf.max_pages, pages.len());
            pages.truncate(self.pdf.max_pages);
        }

        self.process_pages(&pages).await
    }

    /// Select the best page, extract its fields and merge them into a copy
    /// of the template.
    pub async fn process_pages(&self, pages: &[String]) -> Result<PipelineOutput> {
        let selected = tokio::time::timeout(self.index_timeout, self.indexer.select_page(pages))
            .await
            .map_err(|_| SmartxError::Timeout {
                stage: "index",
                after: self.index_timeout,
            })??;

        let SelectedPage { index, text, score } = selected.ok_or(SmartxError::NoRelevantPage)?;

        let raw_response = self.extractor.extract(&text).await?;
        let result = self.parser.parse(&raw_response)?;
        let stage = result.stage();

        let merged = merge(&self.template, &result);
        info!(
            page = index,
            stage = %stage,
            matched = merged.report.matched.len(),
            "Document processed"
        );

        Ok(PipelineOutput {
            page: index,
            score,
            page_text: text,
            raw_response,
            stage,
            result,
            schema: merged.schema,
            report: merged.report,
        })
    }
}
