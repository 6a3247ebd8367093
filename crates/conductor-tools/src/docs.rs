//! Remote documentation-search toolset

use conductor_core::tools::{ApprovalPolicy, RemoteToolConfig};
use std::collections::HashMap;

/// Label the docs tool server registers under
pub const DOCS_SERVER_LABEL: &str = "mslearn";

/// URL of the docs tool server
pub const DOCS_SERVER_URL: &str = "https://learn.microsoft.com/api/mcp";

/// Name of the shared-secret header attached to approved calls
pub const SECRET_HEADER_NAME: &str = "SuperSecret";

/// Value of the shared-secret header
pub const SECRET_HEADER_VALUE: &str = "123456";

/// Instructions for an agent backed by the docs toolset
pub const DOCS_AGENT_INSTRUCTIONS: &str = "\
You have access to a documentation search tool server labelled `mslearn` - \
this tool allows you to search through the latest official documentation. \
Use the available tools to answer questions and perform tasks.";

/// The shared-secret header as approval metadata
pub fn docs_headers() -> HashMap<String, String> {
    HashMap::from([(SECRET_HEADER_NAME.to_string(), SECRET_HEADER_VALUE.to_string())])
}

/// Remote toolset config for the docs server under the given policy
pub fn docs_toolset(approval: ApprovalPolicy) -> RemoteToolConfig {
    RemoteToolConfig::new(DOCS_SERVER_LABEL, DOCS_SERVER_URL)
        .with_approval(approval)
        .with_header(SECRET_HEADER_NAME, SECRET_HEADER_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_toolset_carries_the_secret_header() {
        let config = docs_toolset(ApprovalPolicy::AlwaysApprove);
        assert_eq!(config.server_label, DOCS_SERVER_LABEL);
        assert_eq!(config.approval, ApprovalPolicy::AlwaysApprove);
        assert_eq!(
            config.headers.get(SECRET_HEADER_NAME).map(String::as_str),
            Some(SECRET_HEADER_VALUE)
        );
    }
}
