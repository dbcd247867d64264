//! Ingestion pipeline: decode, deduplicate, probe, rank

use crate::config::AppConfig;
use crate::proxy::checker::{ProxyChecker, TcpProbe, TransportProbe};
use crate::proxy::dedup::Deduplicator;
use crate::proxy::models::ProxyRecord;
use crate::proxy::parser::ProxyParser;
use crate::proxy::ranking;
use crate::proxy::source::{ContentSource, RawContent};
use log::info;
use std::fmt;

/// Stage at which a run ran out of records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyStage {
    Fetch,
    Decode,
    Dedup,
    Probe,
}

impl fmt::Display for EmptyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyStage::Fetch => write!(f, "no content was fetched"),
            EmptyStage::Decode => write!(f, "no proxies could be decoded"),
            EmptyStage::Dedup => write!(f, "no proxies left after deduplication"),
            EmptyStage::Probe => write!(f, "no proxies passed the checks"),
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Live records, fastest first
    Ranked(Vec<ProxyRecord>),
    Empty(EmptyStage),
}

impl PipelineOutcome {
    pub fn records(&self) -> &[ProxyRecord] {
        match self {
            PipelineOutcome::Ranked(records) => records,
            PipelineOutcome::Empty(_) => &[],
        }
    }

    pub fn into_records(self) -> Vec<ProxyRecord> {
        match self {
            PipelineOutcome::Ranked(records) => records,
            PipelineOutcome::Empty(_) => Vec::new(),
        }
    }
}

/// Wires the stages together
pub struct Pipeline<P: TransportProbe = TcpProbe> {
    dedup: Deduplicator,
    checker: ProxyChecker<P>,
    max_count: Option<usize>,
}

impl Pipeline<TcpProbe> {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Deduplicator::new(config.identity_options()),
            ProxyChecker::with_config(config.checker_config()),
            config.top_n,
        )
    }
}

impl<P: TransportProbe> Pipeline<P> {
    pub fn new(dedup: Deduplicator, checker: ProxyChecker<P>, max_count: Option<usize>) -> Self {
        Self {
            dedup,
            checker,
            max_count,
        }
    }

    /// Decode every blob into one flat list, in input order
    pub fn decode(contents: &[RawContent]) -> Vec<ProxyRecord> {
        contents
            .iter()
            .flat_map(|raw| ProxyParser::parse_content(&raw.content, &raw.source))
            .collect()
    }

    /// Decode and deduplicate without probing
    pub fn collect(&self, contents: &[RawContent]) -> Vec<ProxyRecord> {
        self.dedup.dedup(Self::decode(contents))
    }

    /// Fetch from the source, then run every stage
    pub async fn run_source<S: ContentSource + ?Sized>(&self, source: &S) -> PipelineOutcome {
        self.run(source.fetch().await).await
    }

    pub async fn run(&self, contents: Vec<RawContent>) -> PipelineOutcome {
        if contents.is_empty() {
            return PipelineOutcome::Empty(EmptyStage::Fetch);
        }

        let decoded = Self::decode(&contents);
        info!("Decoded {} proxies from {} blobs", decoded.len(), contents.len());
        if decoded.is_empty() {
            return PipelineOutcome::Empty(EmptyStage::Decode);
        }

        let unique = self.dedup.dedup(decoded);
        info!("{} unique proxies after deduplication", unique.len());
        if unique.is_empty() {
            return PipelineOutcome::Empty(EmptyStage::Dedup);
        }

        let live = self.checker.check_proxies(unique).await;
        info!("{} proxies passed the checks", live.len());

        let ranked = ranking::rank(live, self.max_count);
        if ranked.is_empty() {
            return PipelineOutcome::Empty(EmptyStage::Probe);
        }
        info!("Keeping {} proxies", ranked.len());
        PipelineOutcome::Ranked(ranked)
    }
}
