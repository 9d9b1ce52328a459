//! Static MCP resources and prompts.

use serde_json::{Map, Value, json};

use super::tools;

pub const DOCS_URI: &str = "aviationstack://docs";
pub const ENDPOINTS_URI: &str = "aviationstack://endpoints";

pub const PROMPT_FLIGHT_SEARCH: &str = "flight_search_helper";
pub const PROMPT_AIRPORT_LOOKUP: &str = "airport_lookup";

const DOCS: &str = "\
# Aviationstack MCP Server

## Available Tools
- aviationstack_get_flights: Get real-time and historical flight data
- aviationstack_get_airports: Search for global airports
- aviationstack_get_airlines: Search for global airlines
- aviationstack_get_routes: Get airline route information
- aviationstack_get_airplanes: Get aircraft information

## Response Format
All tools return structured responses:
- Success: { meta: { provider, resource, page... }, items: [...], raw: {...} }
- Error: { error: { provider, code, message, retryable... } }

## Environment Variables
- AVIATIONSTACK_API_KEY: Required API key from aviationstack.com
- AVIATIONSTACK_BASE_URL: API base URL (default: http://api.aviationstack.com/v1/)
- AVIATIONSTACK_TIMEOUT_SECONDS: Request timeout (default: 10)
- AVIATIONSTACK_MAX_RETRIES: Max retry attempts (default: 2)
- AVIATIONSTACK_RETRY_BACKOFF_SECONDS: Base backoff interval (default: 0.5)
";

pub fn list_resources() -> Value {
    json!([
        {
            "uri": DOCS_URI,
            "name": "Aviationstack API Documentation",
            "description": "Documentation for Aviationstack MCP tools and usage",
            "mimeType": "text/markdown"
        },
        {
            "uri": ENDPOINTS_URI,
            "name": "Available Endpoints",
            "description": "List of all available Aviationstack API endpoints",
            "mimeType": "application/json"
        }
    ])
}

/// Resource contents for `resources/read`, or `None` for an unknown URI.
pub fn read_resource(uri: &str) -> Option<Value> {
    match uri {
        DOCS_URI => Some(json!([{
            "uri": DOCS_URI,
            "mimeType": "text/markdown",
            "text": DOCS
        }])),
        ENDPOINTS_URI => {
            let endpoints: Vec<Value> = tools::TOOL_NAMES
                .iter()
                .map(|tool| {
                    json!({
                        "name": tools::endpoint_for(tool),
                        "tool": tool
                    })
                })
                .collect();
            Some(json!([{
                "uri": ENDPOINTS_URI,
                "mimeType": "application/json",
                "text": json!({"endpoints": endpoints}).to_string()
            }]))
        }
        _ => None,
    }
}

pub fn list_prompts() -> Value {
    json!([
        {
            "name": PROMPT_FLIGHT_SEARCH,
            "description": "Help users search for flights using natural language",
            "arguments": [
                {
                    "name": "query",
                    "description": "Natural language flight search query",
                    "required": true
                }
            ]
        },
        {
            "name": PROMPT_AIRPORT_LOOKUP,
            "description": "Get airport information by IATA/ICAO code or name",
            "arguments": [
                {
                    "name": "airport_info",
                    "description": "Airport name, IATA code, or ICAO code",
                    "required": true
                }
            ]
        }
    ])
}

/// Prompt content for `prompts/get`, or `None` for an unknown name.
pub fn get_prompt(name: &str, arguments: &Map<String, Value>) -> Option<Value> {
    let arg = |key: &str| {
        arguments
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    match name {
        PROMPT_FLIGHT_SEARCH => {
            let query = arg("query");
            let text = format!(
                "Help me search for flights with this query: \"{}\"\n\n\
                 Use the aviationstack_get_flights tool with appropriate parameters:\n\
                 - flight_date: YYYY-MM-DD format if a date is mentioned\n\
                 - dep_iata / arr_iata: airport IATA codes if mentioned\n\
                 - airline_name / flight_number: if mentioned\n\
                 - flight_status: scheduled, active, landed, cancelled, incident or diverted\n\n\
                 Return the results in a clear, readable format.",
                query
            );
            Some(prompt_result("Flight search helper prompt", text))
        }
        PROMPT_AIRPORT_LOOKUP => {
            let airport_info = arg("airport_info");
            let text = format!(
                "Find information about this airport: \"{}\"\n\n\
                 Use the aviationstack_get_airports tool with appropriate parameters:\n\
                 - search: general search term if an airport name is given\n\
                 - iata_code / icao_code: if a code is given\n\
                 - country_name: if a country is mentioned\n\n\
                 Return detailed airport information including location and codes.",
                airport_info
            );
            Some(prompt_result("Airport lookup prompt", text))
        }
        _ => None,
    }
}

fn prompt_result(description: &str, text: String) -> Value {
    json!({
        "description": description,
        "messages": [
            {
                "role": "user",
                "content": {"type": "text", "text": text}
            }
        ]
    })
}
