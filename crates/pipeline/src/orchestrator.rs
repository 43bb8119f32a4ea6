use crate::config::PipelineConfig;
use crate::documents::DocumentExtractor;
use crate::error::PipelineError;
use crate::retry::RetryPolicy;
use chunking::{Chunk, TokenChunker, Tokenizer};
use extract::{
    ExtractionResult, GenerationModel, GenerationOptions, Requirement, ResponseParser, Validator,
};
use graph::{EmbeddingModel, GraphStore};
use jobs::{JobInput, JobResult, JobTracker, QueueDepthCounter};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One extraction request: already-extracted document texts plus routing
/// inputs.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub texts: Vec<String>,
    pub source_documents: Vec<String>,
    pub project_name: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFailureKind {
    /// The generation call itself failed; the chunk produced no output.
    Generation,
    /// The model produced output that parsed as neither TOON nor JSON.
    Parse,
}

#[derive(Debug, Clone)]
pub struct ChunkFailure {
    pub index: usize,
    pub kind: ChunkFailureKind,
    pub message: String,
}

/// The merged, validated output of a run, with embeddings index-aligned to
/// `result.requirements`.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub result: ExtractionResult,
    pub embeddings: Vec<Vec<f32>>,
    pub application_id: Option<String>,
    pub succeeded_chunks: Vec<usize>,
    pub failed_chunks: Vec<ChunkFailure>,
    pub documents_skipped: usize,
}

/// The pipeline driver: routes between single-shot and chunked processing,
/// invokes the generation and embedding collaborators, merges chunk-level
/// results, and drives persistence and the job lifecycle.
pub struct ExtractionPipeline<G, E> {
    generator: G,
    embedder: E,
    store: Option<Arc<GraphStore>>,
    tracker: JobTracker,
    queue_depth: Arc<QueueDepthCounter>,
    chunker: TokenChunker,
    config: PipelineConfig,
    /// Chunks within a job run sequentially; this lock additionally
    /// serializes generation calls across jobs sharing one inference
    /// backend, acting as backpressure.
    generation_lock: Mutex<()>,
}

impl<G: GenerationModel, E: EmbeddingModel> ExtractionPipeline<G, E> {
    pub fn new(
        generator: G,
        embedder: E,
        store: Option<Arc<GraphStore>>,
        tracker: JobTracker,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let chunker = TokenChunker::new(config.chunk_size, config.chunk_overlap)?;
        Ok(Self {
            generator,
            embedder,
            store,
            tracker,
            queue_depth: Arc::new(QueueDepthCounter::new()),
            chunker,
            config,
            generation_lock: Mutex::new(()),
        })
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub fn queue_depth(&self) -> &QueueDepthCounter {
        &self.queue_depth
    }

    /// Register a job and bump the backlog counter. The caller enqueues the
    /// returned id on its transport.
    pub fn submit(&self, input: JobInput) -> Uuid {
        let job = self.tracker.create(input);
        self.queue_depth.incr();
        job.id
    }

    /// Worker-side consumption of a dispatched job: extract documents,
    /// run the pipeline, settle the job state. The backlog counter is
    /// decremented on completion and on failure alike.
    pub async fn process<D: DocumentExtractor>(&self, job_id: Uuid, extractor: &D) {
        let Some(job) = self.tracker.get(job_id) else {
            tracing::warn!(job_id = %job_id, "cannot process unknown job");
            return;
        };
        if let Err(e) = self.tracker.mark_processing(job_id) {
            tracing::warn!(job_id = %job_id, error = %e, "job not in a runnable state");
            return;
        }

        let mut texts = Vec::new();
        let mut sources = Vec::new();
        let mut skipped = 0;
        for path in &job.input.document_paths {
            match extractor.extract(std::path::Path::new(path)).await {
                Ok(document) => {
                    texts.push(document.text);
                    sources.push(document.source);
                }
                Err(e) => {
                    // Per-file failures are non-fatal to a multi-file job.
                    tracing::warn!(path = %path, error = %e, "document extraction failed, skipping file");
                    skipped += 1;
                }
            }
        }

        let request = ExtractionRequest {
            texts,
            source_documents: sources,
            project_name: job.input.project_name.clone(),
            model: job.input.model.clone(),
        };

        match self.run(&request).await {
            Ok(mut outcome) => {
                outcome.documents_skipped = skipped;
                let result = JobResult {
                    application_id: outcome.application_id.clone().unwrap_or_default(),
                    requirement_count: outcome.result.requirements.len(),
                    requirement_ids: outcome
                        .result
                        .requirements
                        .iter()
                        .map(|r| r.id.clone())
                        .collect(),
                    metadata: HashMap::new(),
                };
                let metadata = HashMap::from([
                    (
                        "chunks_succeeded".to_string(),
                        outcome.succeeded_chunks.len().to_string(),
                    ),
                    (
                        "chunks_failed".to_string(),
                        outcome.failed_chunks.len().to_string(),
                    ),
                    ("documents_skipped".to_string(), skipped.to_string()),
                ]);
                if let Err(e) = self.tracker.mark_completed(job_id, result, metadata) {
                    tracing::warn!(job_id = %job_id, error = %e, "could not mark job completed");
                }
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "extraction job failed");
                if let Err(mark_err) = self.tracker.mark_failed(job_id, e.to_string()) {
                    tracing::warn!(job_id = %job_id, error = %mark_err, "could not mark job failed");
                }
            }
        }

        self.queue_depth.decr();
    }

    /// The extraction-to-graph pipeline for one request.
    pub async fn run(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome, PipelineError> {
        let combined = request.texts.join("\n\n");
        if combined.trim().is_empty() {
            tracing::info!(project = %request.project_name, "no document text, completing with empty result");
            return Ok(self.empty_outcome());
        }

        let tokenizer = Tokenizer::for_model(&request.model);
        let total_tokens = tokenizer.count(&combined);

        // Single-shot below the threshold, windowed above it.
        let chunks: Vec<Chunk> = if total_tokens > self.config.sync_token_threshold {
            self.chunker.chunk_with(&tokenizer, &combined)
        } else {
            vec![Chunk::single(combined.clone(), total_tokens)]
        };
        tracing::info!(
            project = %request.project_name,
            total_tokens,
            chunk_count = chunks.len(),
            "extraction routed"
        );

        let (succeeded, failed) = self.extract_chunks(&chunks).await;

        // Generation exhaustion across every chunk is fatal; parse failures
        // mean the collaborator did produce output, so an all-parse-failure
        // run still completes with an empty result.
        if succeeded.is_empty()
            && !failed.is_empty()
            && failed.iter().all(|f| f.kind == ChunkFailureKind::Generation)
        {
            let message = failed
                .first()
                .map(|f| f.message.clone())
                .unwrap_or_default();
            return Err(PipelineError::GenerationExhausted(message));
        }

        // Merge in chunk order, then dedup/backfill/normalize.
        let merged: Vec<Requirement> = succeeded
            .iter()
            .flat_map(|(_, requirements)| requirements.iter().cloned())
            .collect();
        let mut requirements = Validator::validate(merged);

        let source_label = request.source_documents.join(", ");
        if !source_label.is_empty() {
            for requirement in &mut requirements {
                if requirement.provenance.source_document.is_none() {
                    requirement.provenance.source_document = Some(source_label.clone());
                }
            }
        }

        let embeddings = self.embed_requirements(&requirements).await?;

        let application_id = if self.config.persist {
            match &self.store {
                Some(store) => Some(
                    self.persist(store, &request.project_name, &requirements, &embeddings)
                        .await?,
                ),
                None => None,
            }
        } else {
            None
        };

        Ok(ExtractionOutcome {
            result: ExtractionResult { requirements },
            embeddings,
            application_id,
            succeeded_chunks: succeeded.into_iter().map(|(index, _)| index).collect(),
            failed_chunks: failed,
            documents_skipped: 0,
        })
    }

    /// Sequential per-chunk generation and parsing. Each chunk is its own
    /// failure unit: the outcome lists collect successes and failures
    /// instead of short-circuiting.
    async fn extract_chunks(
        &self,
        chunks: &[Chunk],
    ) -> (Vec<(usize, Vec<Requirement>)>, Vec<ChunkFailure>) {
        let retry = RetryPolicy::new(&self.config.retry);
        let options = GenerationOptions::default();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for chunk in chunks {
            let prompt = extract::prompt::build_extraction_prompt(&chunk.text, chunk.index, chunk.total);

            let response = {
                let _backpressure = self.generation_lock.lock().await;
                retry
                    .retry("generate", || self.generator.generate(&prompt, &options))
                    .await
            };

            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(chunk = chunk.index, error = %e, "generation failed for chunk");
                    failed.push(ChunkFailure {
                        index: chunk.index,
                        kind: ChunkFailureKind::Generation,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match ResponseParser::parse(&response) {
                Ok(requirements) => {
                    tracing::debug!(
                        chunk = chunk.index,
                        count = requirements.len(),
                        "chunk parsed"
                    );
                    succeeded.push((chunk.index, requirements));
                }
                Err(e) => {
                    // A parse failure yields an empty result for this chunk,
                    // never an aborted job.
                    tracing::warn!(chunk = chunk.index, error = %e, "unparseable chunk output");
                    failed.push(ChunkFailure {
                        index: chunk.index,
                        kind: ChunkFailureKind::Parse,
                        message: e.to_string(),
                    });
                }
            }
        }

        (succeeded, failed)
    }

    /// One embedding call per requirement, sequential so the returned list
    /// stays index-aligned with the requirement list.
    async fn embed_requirements(
        &self,
        requirements: &[Requirement],
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let retry = RetryPolicy::new(&self.config.retry);
        let mut embeddings = Vec::with_capacity(requirements.len());
        for requirement in requirements {
            let text = requirement.embedding_text();
            let embedding = retry
                .retry("embed", || self.embedder.embed(&text))
                .await?;
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }

    async fn persist(
        &self,
        store: &GraphStore,
        project_name: &str,
        requirements: &[Requirement],
        embeddings: &[Vec<f32>],
    ) -> Result<String, PipelineError> {
        let app_id = store.upsert_application(project_name, None).await?;
        for (requirement, embedding) in requirements.iter().zip(embeddings) {
            store
                .upsert_requirement(&app_id, requirement, embedding)
                .await?;
        }
        let edges = store.create_relationships(requirements).await;
        tracing::info!(
            application = %app_id,
            requirements = requirements.len(),
            edges,
            "extraction persisted"
        );
        Ok(app_id)
    }

    fn empty_outcome(&self) -> ExtractionOutcome {
        ExtractionOutcome {
            result: ExtractionResult::default(),
            embeddings: Vec::new(),
            application_id: None,
            succeeded_chunks: Vec::new(),
            failed_chunks: Vec::new(),
            documents_skipped: 0,
        }
    }
}
