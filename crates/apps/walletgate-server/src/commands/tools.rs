//! Print the tool listing.

use walletgate_tools::{ToolListing, ToolRegistry};

use crate::error::ServerResult;

/// Execute the tools command.
pub fn tools(registry: &ToolRegistry, json: bool) -> ServerResult<String> {
    let listing: Vec<ToolListing> = registry.list_tools().collect();
    if json {
        return Ok(serde_json::to_string_pretty(&listing)?);
    }

    let name_width = listing.iter().map(|t| t.name.len()).max().unwrap_or(0);
    let price_width = listing.iter().map(|t| t.price.len()).max().unwrap_or(0);
    let lines: Vec<String> = listing
        .iter()
        .map(|t| {
            format!(
                "{:<nw$}  {:>pw$}  {}",
                t.name,
                t.price,
                t.description,
                nw = name_width,
                pw = price_width
            )
        })
        .collect();
    Ok(lines.join("\n"))
}
