use crate::core::errors::IgError;
use crate::core::kernel::RestClient;
use crate::service::IgService;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// One line of the market navigation tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEntry {
    Node {
        depth: usize,
        id: String,
        name: String,
    },
    Market {
        depth: usize,
        epic: String,
        instrument_name: String,
        expiry: String,
    },
}

impl NavigationEntry {
    pub const fn depth(&self) -> usize {
        match self {
            Self::Node { depth, .. } | Self::Market { depth, .. } => *depth,
        }
    }
}

impl fmt::Display for NavigationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "  ".repeat(self.depth());
        match self {
            Self::Node { id, name, .. } => write!(f, "{}{} [{}]", indent, name, id),
            Self::Market {
                epic,
                instrument_name,
                expiry,
                ..
            } => write!(f, "{}{} ({}): {}", indent, instrument_name, expiry, epic),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NavigationLevel {
    #[serde(default)]
    nodes: Option<Vec<RawNode>>,
    #[serde(default)]
    markets: Option<Vec<RawMarket>>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarket {
    epic: String,
    instrument_name: String,
    #[serde(default)]
    expiry: String,
}

fn parse_level(payload: Value) -> Result<(Vec<RawNode>, Vec<RawMarket>), IgError> {
    let level: NavigationLevel = serde_json::from_value(payload)?;
    Ok((
        level.nodes.unwrap_or_default(),
        level.markets.unwrap_or_default(),
    ))
}

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), IgError>> + Send + 'a>>;

impl<R: RestClient> IgService<R> {
    /// Depth-first walk of the navigation tree below `root`, or below the
    /// top level when `root` is `None`. Each node is followed by its
    /// descendants; a node's own markets come after its child nodes.
    pub async fn walk_navigation(&self, root: Option<&str>) -> Result<Vec<NavigationEntry>, IgError> {
        let mut entries = Vec::new();
        let payload = match root {
            Some(node) => self.fetch_sub_nodes_by_node(node).await?,
            None => self.fetch_top_level_navigation_nodes().await?,
        };
        self.walk_level(payload, 0, &mut entries).await?;
        Ok(entries)
    }

    fn walk_level<'a>(
        &'a self,
        payload: Value,
        depth: usize,
        entries: &'a mut Vec<NavigationEntry>,
    ) -> WalkFuture<'a> {
        Box::pin(async move {
            let (nodes, markets) = parse_level(payload)?;
            for node in nodes {
                debug!(node = %node.id, depth, "Descending into node");
                let children = self.fetch_sub_nodes_by_node(&node.id).await?;
                entries.push(NavigationEntry::Node {
                    depth,
                    id: node.id,
                    name: node.name,
                });
                self.walk_level(children, depth + 1, entries).await?;
            }
            entries.extend(markets.into_iter().map(|market| NavigationEntry::Market {
                depth,
                epic: market.epic,
                instrument_name: market.instrument_name,
                expiry: market.expiry,
            }));
            Ok::<(), IgError>(())
        })
    }
}
