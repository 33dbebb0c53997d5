//! In-memory frame tree with a short per-edge history.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::core::{Timestamp, Transform};

use super::{FrameRegistry, LookupError, LookupTime, StampedTransform};

/// Configuration for [`FrameTree`].
#[derive(Clone, Debug)]
pub struct FrameTreeConfig {
    /// How far behind its newest sample an edge keeps history
    pub cache_duration: Duration,
}

impl Default for FrameTreeConfig {
    fn default() -> Self {
        Self {
            cache_duration: Duration::from_secs(10),
        }
    }
}

/// Edge from a parent frame to one child frame.
#[derive(Debug)]
struct Edge {
    parent: String,
    /// Samples ordered by stamp, oldest first
    samples: VecDeque<(Timestamp, Transform)>,
}

impl Edge {
    fn oldest(&self) -> Timestamp {
        self.samples.front().map(|s| s.0).unwrap_or_default()
    }

    fn newest(&self) -> Timestamp {
        self.samples.back().map(|s| s.0).unwrap_or_default()
    }

    /// Newest sample at or before `time`.
    fn sample_at(&self, time: Timestamp) -> Option<&Transform> {
        self.samples
            .iter()
            .rev()
            .find(|(stamp, _)| *stamp <= time)
            .map(|(_, t)| t)
    }
}

/// Tree of named frames. Every frame has at most one parent.
#[derive(Debug, Default)]
pub struct FrameTree {
    config: FrameTreeConfig,
    /// Keyed by child frame name
    edges: HashMap<String, Edge>,
}

impl FrameTree {
    pub fn new(config: FrameTreeConfig) -> Self {
        Self {
            config,
            edges: HashMap::new(),
        }
    }

    /// Whether `frame` appears anywhere in the tree.
    pub fn contains(&self, frame: &str) -> bool {
        self.edges.contains_key(frame) || self.edges.values().any(|e| e.parent == frame)
    }

    /// Parent of `frame`, if it has one.
    pub fn parent_of(&self, frame: &str) -> Option<&str> {
        self.edges.get(frame).map(|e| e.parent.as_str())
    }

    /// Insert a transform sample.
    pub fn publish(&mut self, frame: StampedTransform) {
        if frame.parent == frame.child || self.ancestors(&frame.parent).contains(&frame.child) {
            tracing::warn!(
                "Ignoring {} -> {}: would create a loop in the frame tree",
                frame.parent,
                frame.child
            );
            return;
        }

        let edge = self
            .edges
            .entry(frame.child.clone())
            .or_insert_with(|| Edge {
                parent: frame.parent.clone(),
                samples: VecDeque::new(),
            });

        if edge.parent != frame.parent {
            tracing::debug!(
                "Frame {} re-parented from {} to {}",
                frame.child,
                edge.parent,
                frame.parent
            );
            edge.parent = frame.parent;
            edge.samples.clear();
        }

        // Keep samples ordered; out-of-order publishers are rare
        let pos = edge
            .samples
            .iter()
            .rposition(|(stamp, _)| *stamp <= frame.stamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        if pos > 0 && edge.samples[pos - 1].0 == frame.stamp {
            edge.samples[pos - 1].1 = frame.transform;
        } else {
            edge.samples.insert(pos, (frame.stamp, frame.transform));
        }

        let horizon = edge.newest().saturating_sub(self.config.cache_duration);
        while edge.samples.len() > 1 && edge.oldest() < horizon {
            edge.samples.pop_front();
        }
    }

    /// Resolve the pose of `source` in `target`.
    pub fn lookup(
        &self,
        target: &str,
        source: &str,
        at: LookupTime,
    ) -> Result<StampedTransform, LookupError> {
        for frame in [target, source] {
            if !self.contains(frame) {
                return Err(LookupError::UnknownFrame(frame.to_string()));
            }
        }

        let source_chain = self.ancestors(source);
        let target_chain = self.ancestors(target);

        let common = source_chain
            .iter()
            .position(|f| target_chain.contains(f))
            .ok_or_else(|| LookupError::Disconnected {
                target_frame: target.to_string(),
                source_frame: source.to_string(),
            })?;
        let common_frame = &source_chain[common];
        let target_depth = target_chain
            .iter()
            .position(|f| f == common_frame)
            .unwrap_or(target_chain.len());

        // Frames below the common ancestor, each owning the edge to its parent
        let source_edges = &source_chain[..common];
        let target_edges = &target_chain[..target_depth];

        let time = match at {
            LookupTime::At(t) => t,
            LookupTime::Latest => source_edges
                .iter()
                .chain(target_edges)
                .filter_map(|f| self.edges.get(f.as_str()))
                .map(Edge::newest)
                .min()
                .unwrap_or_default(),
        };

        let source_in_common = self.compose_down(source_edges, time, at)?;
        let target_in_common = self.compose_down(target_edges, time, at)?;

        Ok(StampedTransform {
            parent: target.to_string(),
            child: source.to_string(),
            transform: target_in_common.inverse().compose(&source_in_common),
            stamp: time,
        })
    }

    /// `frame` followed by each of its ancestors up to the root.
    fn ancestors(&self, frame: &str) -> Vec<String> {
        let mut chain = vec![frame.to_string()];
        let mut current = frame;
        while let Some(edge) = self.edges.get(current) {
            // Loops are rejected on publish; the bound is a second guard
            if chain.len() > self.edges.len() + 1 {
                break;
            }
            chain.push(edge.parent.clone());
            current = &edge.parent;
        }
        chain
    }

    /// Compose edges from the common ancestor down to `frames[0]`.
    ///
    /// `frames` is ordered child-first, as returned by [`Self::ancestors`].
    fn compose_down(
        &self,
        frames: &[String],
        time: Timestamp,
        at: LookupTime,
    ) -> Result<Transform, LookupError> {
        let mut result = Transform::identity();
        for frame in frames.iter().rev() {
            let Some(edge) = self.edges.get(frame.as_str()) else {
                continue;
            };
            let future = matches!(at, LookupTime::At(_)) && time > edge.newest();
            let sample = edge.sample_at(time).filter(|_| !future).ok_or_else(|| {
                LookupError::Extrapolation {
                    frame: frame.clone(),
                    requested: time,
                    oldest: edge.oldest(),
                    newest: edge.newest(),
                }
            })?;
            result = result.compose(sample);
        }
        Ok(result)
    }
}

impl FrameRegistry for FrameTree {
    fn publish_frame(&mut self, frame: StampedTransform) {
        self.publish(frame);
    }

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        at: LookupTime,
    ) -> Result<StampedTransform, LookupError> {
        self.lookup(target, source, at)
    }
}
