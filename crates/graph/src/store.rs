use crate::search::{Candidate, SearchFilters, SearchHit, SearchWeights};
use extract::Requirement;
use neo4rs::{Graph, Query};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph write failed: {0}")]
    Persistence(#[from] neo4rs::Error),
    #[error("application upsert returned no id for '{name}'")]
    MissingApplicationId { name: String },
}

/// Idempotent persistence of the requirement graph plus hybrid search.
///
/// No application-level locking: correctness rests on MERGE semantics keyed
/// by natural identifiers, so concurrent workers and retries are safe.
pub struct GraphStore {
    graph: Graph,
    weights: SearchWeights,
}

impl GraphStore {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            weights: SearchWeights::default(),
        }
    }

    pub fn with_weights(graph: Graph, weights: SearchWeights) -> Self {
        Self { graph, weights }
    }

    /// Uniqueness constraint on requirement ids plus lookup indexes.
    pub async fn init_schema(&self) -> Result<(), GraphError> {
        let statements = [
            "CREATE CONSTRAINT requirement_id_unique IF NOT EXISTS \
             FOR (r:Requirement) REQUIRE r.id IS UNIQUE",
            "CREATE INDEX application_normalized_name IF NOT EXISTS \
             FOR (a:Application) ON (a.normalized_name)",
            "CREATE INDEX requirement_category IF NOT EXISTS \
             FOR (r:Requirement) ON (r.category)",
        ];
        for statement in statements {
            self.graph.run(Query::new(statement.to_string())).await?;
        }
        tracing::info!("graph schema initialized");
        Ok(())
    }

    /// Merge keyed by the case-insensitive normalized name, so re-runs
    /// against the same project update one node instead of creating
    /// duplicates.
    pub async fn upsert_application(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, GraphError> {
        let normalized = name.trim().to_lowercase();
        let candidate_id = Uuid::new_v4().to_string();

        let query = Query::new(
            r#"
            MERGE (a:Application {normalized_name: $normalized})
            ON CREATE SET a.id = $candidate_id, a.created_at = datetime()
            SET a.name = $name,
                a.description = CASE WHEN $description = ''
                                     THEN coalesce(a.description, '')
                                     ELSE $description END,
                a.updated_at = datetime()
            RETURN a.id AS id
            "#
            .to_string(),
        )
        .param("normalized", normalized)
        .param("candidate_id", candidate_id)
        .param("name", name.trim().to_string())
        .param("description", description.unwrap_or_default().to_string());

        let mut result = self.graph.execute(query).await?;
        match result.next().await? {
            Some(row) => Ok(row
                .get::<String>("id")
                .map_err(neo4rs::Error::DeserializationError)?),
            None => Err(GraphError::MissingApplicationId {
                name: name.to_string(),
            }),
        }
    }

    /// Merge keyed by requirement id. On update the version counter
    /// increments and the second write's attributes win. Secondary entities
    /// are re-derived: this requirement's typed edges are deleted and
    /// reconnected to content-addressed nodes; the nodes themselves are
    /// never deleted since other requirements may share them.
    pub async fn upsert_requirement(
        &self,
        app_id: &str,
        requirement: &Requirement,
        embedding: &[f32],
    ) -> Result<String, GraphError> {
        let embedding: Vec<f64> = embedding.iter().map(|v| *v as f64).collect();

        let query = Query::new(
            r#"
            MERGE (r:Requirement {id: $id})
            ON CREATE SET r.version = 1, r.created_at = datetime()
            ON MATCH SET r.version = coalesce(r.version, 0) + 1
            SET r.name = $name,
                r.description = $description,
                r.requirement_type = $requirement_type,
                r.priority = $priority,
                r.category = $category,
                r.tags = $tags,
                r.status = $status,
                r.source_document = $source_document,
                r.embedding = $embedding,
                r.updated_at = datetime()
            WITH r
            MATCH (a:Application {id: $app_id})
            MERGE (a)-[:HAS_REQUIREMENT]->(r)
            "#
            .to_string(),
        )
        .param("id", requirement.id.clone())
        .param("name", requirement.name.clone())
        .param("description", requirement.description.clone())
        .param("requirement_type", requirement.requirement_type.as_str())
        .param("priority", requirement.priority.as_str())
        .param("category", requirement.category.clone())
        .param("tags", requirement.tags.join(";"))
        .param("status", requirement.status.clone())
        .param(
            "source_document",
            requirement
                .provenance
                .source_document
                .clone()
                .unwrap_or_default(),
        )
        .param("embedding", embedding)
        .param("app_id", app_id.to_string());

        self.graph.run(query).await?;

        self.rederive_secondary_entities(requirement).await?;

        Ok(requirement.id.clone())
    }

    async fn rederive_secondary_entities(
        &self,
        requirement: &Requirement,
    ) -> Result<(), GraphError> {
        let detach = Query::new(
            r#"
            MATCH (r:Requirement {id: $id})-[e:HAS_RISK|HAS_CONSTRAINT|HAS_ASSUMPTION|INVOLVES]->()
            DELETE e
            "#
            .to_string(),
        )
        .param("id", requirement.id.clone());
        self.graph.run(detach).await?;

        for risk in &requirement.risks {
            let query = Query::new(
                r#"
                MATCH (r:Requirement {id: $id})
                MERGE (k:Risk {description: $description})
                SET k.severity = CASE WHEN $severity = ''
                                      THEN coalesce(k.severity, '')
                                      ELSE $severity END
                MERGE (r)-[:HAS_RISK]->(k)
                "#
                .to_string(),
            )
            .param("id", requirement.id.clone())
            .param("description", risk.description.clone())
            .param("severity", risk.severity.clone().unwrap_or_default());
            self.graph.run(query).await?;
        }

        for constraint in &requirement.constraints {
            let query = Query::new(
                r#"
                MATCH (r:Requirement {id: $id})
                MERGE (c:Constraint {description: $description})
                SET c.constraint_type = CASE WHEN $constraint_type = ''
                                             THEN coalesce(c.constraint_type, '')
                                             ELSE $constraint_type END
                MERGE (r)-[:HAS_CONSTRAINT]->(c)
                "#
                .to_string(),
            )
            .param("id", requirement.id.clone())
            .param("description", constraint.description.clone())
            .param(
                "constraint_type",
                constraint.constraint_type.clone().unwrap_or_default(),
            );
            self.graph.run(query).await?;
        }

        for assumption in &requirement.assumptions {
            let query = Query::new(
                r#"
                MATCH (r:Requirement {id: $id})
                MERGE (s:Assumption {description: $description})
                SET s.confidence = CASE WHEN $confidence = ''
                                        THEN coalesce(s.confidence, '')
                                        ELSE $confidence END
                MERGE (r)-[:HAS_ASSUMPTION]->(s)
                "#
                .to_string(),
            )
            .param("id", requirement.id.clone())
            .param("description", assumption.description.clone())
            .param(
                "confidence",
                assumption.confidence.clone().unwrap_or_default(),
            );
            self.graph.run(query).await?;
        }

        for stakeholder in &requirement.provenance.stakeholders {
            let query = Query::new(
                r#"
                MATCH (r:Requirement {id: $id})
                MERGE (p:Person {name: $name})
                MERGE (r)-[:INVOLVES]->(p)
                "#
                .to_string(),
            )
            .param("id", requirement.id.clone())
            .param("name", stakeholder.clone());
            self.graph.run(query).await?;
        }

        Ok(())
    }

    /// Derive directed edges from declared dependencies. Each edge is
    /// attempted independently; a missing target or a failed write loses
    /// only that edge, never the batch.
    pub async fn create_relationships(&self, requirements: &[Requirement]) -> usize {
        let mut created = 0;

        for requirement in requirements {
            let deps = &requirement.dependencies;
            let mut edges: Vec<(&str, &str)> = Vec::new();

            for target in &deps.depends_on {
                edges.push((target, "DEPENDS_ON"));
            }
            for target in &deps.conflicts {
                edges.push((target, "CONFLICTS_WITH"));
            }
            for target in &deps.extends {
                edges.push((target, "EXTENDS"));
            }
            // Generic fallback for related ids not already covered by a more
            // specific relation.
            for target in &requirement.related_requirements {
                if !edges.iter().any(|(t, _)| t == target) {
                    edges.push((target, "RELATED_TO"));
                }
            }

            for (target, relation) in edges {
                match self.create_edge(&requirement.id, target, relation).await {
                    Ok(true) => created += 1,
                    Ok(false) => {}
                    Err(e) => tracing::warn!(
                        source = %requirement.id,
                        target = target,
                        relation = relation,
                        error = %e,
                        "edge creation failed, skipping"
                    ),
                }
            }
        }

        created
    }

    async fn create_edge(
        &self,
        source: &str,
        target: &str,
        relation: &str,
    ) -> Result<bool, GraphError> {
        // Relation kind is from a fixed internal set, safe to splice.
        let query = Query::new(format!(
            r#"
            MATCH (s:Requirement {{id: $source}})
            MATCH (t:Requirement {{id: $target}})
            MERGE (s)-[:{relation}]->(t)
            RETURN t.id AS id
            "#
        ))
        .param("source", source.to_string())
        .param("target", target.to_string());

        let mut result = self.graph.execute(query).await?;
        if result.next().await?.is_none() {
            tracing::warn!(
                source = source,
                target = target,
                relation = relation,
                "relationship target not found, skipping edge"
            );
            return Ok(false);
        }
        Ok(true)
    }

    /// Hybrid similarity + keyword search. Equality filters are applied in
    /// the query; scoring and the keyword-match floor exemption happen in
    /// `search::rank`.
    pub async fn search(
        &self,
        query_embedding: &[f32],
        query_text: &str,
        filters: &SearchFilters,
        limit: usize,
        min_similarity: Option<f64>,
    ) -> Result<Vec<SearchHit>, GraphError> {
        let embedding: Vec<f64> = query_embedding.iter().map(|v| *v as f64).collect();

        let mut clauses: Vec<&str> = vec!["r.embedding IS NOT NULL"];
        if filters.requirement_type.is_some() {
            clauses.push("r.requirement_type = $requirement_type");
        }
        if filters.priority.is_some() {
            clauses.push("r.priority = $priority");
        }
        if filters.status.is_some() {
            clauses.push("r.status = $status");
        }

        let cypher = format!(
            r#"
            MATCH (r:Requirement)
            WHERE {}
            WITH r, vector.similarity.cosine(r.embedding, $query_embedding) AS similarity
            RETURN r.id AS id, r.name AS name, r.description AS description,
                   r.category AS category, r.tags AS tags, similarity
            "#,
            clauses.join(" AND ")
        );

        let mut query = Query::new(cypher).param("query_embedding", embedding);
        if let Some(rtype) = &filters.requirement_type {
            query = query.param("requirement_type", rtype.clone());
        }
        if let Some(priority) = &filters.priority {
            query = query.param("priority", priority.clone());
        }
        if let Some(status) = &filters.status {
            query = query.param("status", status.clone());
        }

        let mut result = self.graph.execute(query).await?;
        let mut candidates = Vec::new();
        while let Some(row) = result.next().await? {
            let tags: String = row.get("tags").unwrap_or_default();
            candidates.push(Candidate {
                id: row.get("id").map_err(neo4rs::Error::DeserializationError)?,
                name: row.get("name").unwrap_or_default(),
                description: row.get("description").unwrap_or_default(),
                category: row.get("category").unwrap_or_default(),
                tags: tags
                    .split(';')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
                similarity: row.get::<f64>("similarity").unwrap_or(0.0),
            });
        }

        Ok(crate::search::rank(
            candidates,
            query_text,
            &self.weights,
            limit,
            min_similarity,
        ))
    }

    /// Diagnostic counts.
    pub async fn stats(&self) -> Result<GraphStats, GraphError> {
        let apps = self.count("MATCH (a:Application) RETURN count(a) AS count").await?;
        let requirements = self
            .count("MATCH (r:Requirement) RETURN count(r) AS count")
            .await?;
        let relationships = self
            .count(
                "MATCH (:Requirement)-[e:DEPENDS_ON|CONFLICTS_WITH|EXTENDS|RELATED_TO]->(:Requirement) \
                 RETURN count(e) AS count",
            )
            .await?;
        Ok(GraphStats {
            applications: apps,
            requirements,
            relationships,
        })
    }

    async fn count(&self, cypher: &str) -> Result<usize, GraphError> {
        let mut result = self.graph.execute(Query::new(cypher.to_string())).await?;
        match result.next().await? {
            Some(row) => Ok(row.get::<i64>("count").unwrap_or(0) as usize),
            None => Ok(0),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct GraphStats {
    pub applications: usize,
    pub requirements: usize,
    pub relationships: usize,
}
