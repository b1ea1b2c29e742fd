use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::{debug, instrument};

use drover_model::{JobDefinition, RawProperties, TaskRole, TaskSpec};

use crate::{
    assemble::assemble,
    error::{DslError, DslResult},
    json::promote,
    lexer::{TokenStream, Tokenizer},
};

/// One `<provider> <title> { ... }` block with promoted properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedBlock {
    pub provider: String,
    pub name: String,
    pub properties: RawProperties,
}

/// Set of provider names a job may reference.
pub trait ProviderCatalog {
    /// Returns `true` if a provider with this name is known.
    fn contains(&self, provider: &str) -> bool;
}

impl ProviderCatalog for HashSet<String> {
    fn contains(&self, provider: &str) -> bool {
        HashSet::contains(self, provider)
    }
}

impl ProviderCatalog for BTreeSet<String> {
    fn contains(&self, provider: &str) -> bool {
        BTreeSet::contains(self, provider)
    }
}

impl ProviderCatalog for [&str] {
    fn contains(&self, provider: &str) -> bool {
        self.iter().any(|p| *p == provider)
    }
}

impl ProviderCatalog for Vec<String> {
    fn contains(&self, provider: &str) -> bool {
        self.iter().any(|p| p == provider)
    }
}

#[derive(Deserialize)]
struct DocumentBlock<'a> {
    provider: String,
    name: String,
    #[serde(borrow)]
    properties: &'a RawValue,
}

/// Parse job file text into its ordered blocks.
///
/// The tokenizer runs on a worker thread; the assembler consumes its tokens.
pub fn parse_blocks(text: &str) -> DslResult<Vec<ParsedBlock>> {
    let tokens = TokenStream::spawn(Tokenizer::new(text))?;
    let document = assemble(tokens)?;
    let blocks: Vec<DocumentBlock<'_>> = serde_json::from_str(&document)?;

    blocks
        .into_iter()
        .map(|block| -> DslResult<ParsedBlock> {
            let promoted = promote(block.properties.get());
            // Reject anything promotion could not turn into a proper object.
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&promoted)?;
            Ok(ParsedBlock {
                provider: block.provider,
                name: block.name,
                properties: RawProperties::new(promoted),
            })
        })
        .collect()
}

/// Parse one job file into a [`JobDefinition`].
///
/// The first block becomes the event task. Every task binds to the provider
/// instance keyed by its provider name, so blocks sharing a provider share
/// one instance on the runner.
#[instrument(level = "debug", skip(text, catalog), fields(job = %name))]
pub fn parse_job<C>(name: &str, text: &str, catalog: &C) -> DslResult<JobDefinition>
where
    C: ProviderCatalog + ?Sized,
{
    let blocks = parse_blocks(text)?;
    if blocks.is_empty() {
        return Err(DslError::Empty(name.to_string()));
    }

    let mut titles = HashSet::with_capacity(blocks.len());
    let mut tasks = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.into_iter().enumerate() {
        if !catalog.contains(&block.provider) {
            return Err(DslError::UnknownProvider {
                job: name.to_string(),
                provider: block.provider,
            });
        }
        if !titles.insert(block.name.clone()) {
            return Err(DslError::DuplicateTitle {
                job: name.to_string(),
                title: block.name,
            });
        }

        tasks.push(TaskSpec {
            index,
            title: block.name,
            instance_key: block.provider.clone(),
            provider: block.provider,
            role: if index == 0 {
                TaskRole::Event
            } else {
                TaskRole::Action
            },
            properties: block.properties,
        });
    }

    debug!(tasks = tasks.len(), "job parsed");
    Ok(JobDefinition {
        name: name.to_string(),
        tasks,
    })
}
