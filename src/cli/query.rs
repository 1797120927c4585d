//! Query command handler.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use crate::context::Context;
use crate::reasoning::{Filters, QueryRequest};
use crate::services::{Actor, GraphService};

use super::{print_json, App};

impl App {
    /// Answer a query against a graph in the configured store.
    pub async fn run_query(
        &self,
        text: &str,
        graph_id: &str,
        depth: Option<u32>,
        filters: Option<&str>,
        user: &Option<String>,
        session: &Option<String>,
    ) -> Result<()> {
        let filters = match filters {
            Some(raw) => {
                let value = serde_json::from_str(raw).wrap_err("--filters is not valid JSON")?;
                Filters::from_value(value)?
            }
            None => Filters::default(),
        };

        let config = self.config()?;
        if config.store.snapshot.is_none() {
            tracing::warn!("No store snapshot configured, querying an empty store");
        }
        let ctx = Context::new(config).await?;
        let service = GraphService::new(&ctx);

        let request = QueryRequest {
            query: text.to_string(),
            graph_id: graph_id.to_string(),
            filters,
            max_depth: depth,
        };
        let actor = Actor::new(user.clone(), session.clone());
        let answer = service.answer(request, &actor).await?;

        print_json(&answer)
    }
}
