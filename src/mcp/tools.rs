//! Tool registry: each tool maps 1:1 to an Aviationstack endpoint.

use serde_json::{Value, json};

pub const GET_FLIGHTS: &str = "aviationstack_get_flights";
pub const GET_AIRPORTS: &str = "aviationstack_get_airports";
pub const GET_AIRLINES: &str = "aviationstack_get_airlines";
pub const GET_ROUTES: &str = "aviationstack_get_routes";
pub const GET_AIRPLANES: &str = "aviationstack_get_airplanes";

pub const TOOL_NAMES: [&str; 5] = [
    GET_FLIGHTS,
    GET_AIRPORTS,
    GET_AIRLINES,
    GET_ROUTES,
    GET_AIRPLANES,
];

/// Resolves a tool name to its provider endpoint.
pub fn endpoint_for(tool: &str) -> Option<&'static str> {
    match tool {
        GET_FLIGHTS => Some("flights"),
        GET_AIRPORTS => Some("airports"),
        GET_AIRLINES => Some("airlines"),
        GET_ROUTES => Some("routes"),
        GET_AIRPLANES => Some("airplanes"),
        _ => None,
    }
}

/// Tool declarations for `tools/list`, each carrying the shared output
/// schema so clients can validate the envelope either way it comes back.
pub fn list_tools() -> Value {
    json!([
        tool(
            GET_FLIGHTS,
            "Get real-time and historical flight data.",
            json!({
                "type": "object",
                "properties": {
                    "flight_status": {
                        "type": "string",
                        "enum": [
                            "scheduled", "active", "landed",
                            "cancelled", "incident", "diverted"
                        ]
                    },
                    "flight_date": {
                        "type": "string",
                        "description": "Date in YYYY-MM-DD format"
                    },
                    "dep_iata": {
                        "type": "string",
                        "description": "Departure airport IATA code"
                    },
                    "arr_iata": {
                        "type": "string",
                        "description": "Arrival airport IATA code"
                    },
                    "airline_name": {"type": "string"},
                    "flight_number": {"type": "string"}
                }
            }),
        ),
        tool(
            GET_AIRPORTS,
            "Search for global airports.",
            json!({
                "type": "object",
                "properties": {
                    "search": {"type": "string", "description": "Search query"},
                    "iata_code": {"type": "string"},
                    "icao_code": {"type": "string"},
                    "country_name": {"type": "string"}
                }
            }),
        ),
        tool(
            GET_AIRLINES,
            "Search for global airlines.",
            json!({
                "type": "object",
                "properties": {
                    "airline_name": {"type": "string"},
                    "iata_code": {"type": "string"},
                    "icao_code": {"type": "string"}
                }
            }),
        ),
        tool(
            GET_ROUTES,
            "Get information about airline routes.",
            json!({
                "type": "object",
                "properties": {
                    "dep_iata": {
                        "type": "string",
                        "description": "Departure airport IATA code"
                    },
                    "arr_iata": {
                        "type": "string",
                        "description": "Arrival airport IATA code"
                    },
                    "airline_name": {"type": "string"}
                }
            }),
        ),
        tool(
            GET_AIRPLANES,
            "Get information about specific aircraft.",
            json!({
                "type": "object",
                "properties": {
                    "registration_number": {"type": "string"},
                    "iata_type": {"type": "string"}
                }
            }),
        ),
    ])
}

fn tool(name: &str, description: &str, input_schema: Value) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": input_schema,
        "outputSchema": output_schema(),
    })
}

/// Shared `oneOf` schema: normalized success envelope or error payload.
pub fn output_schema() -> Value {
    json!({
        "oneOf": [
            {
                "type": "object",
                "description": "Normalized successful response from Aviationstack",
                "properties": {
                    "meta": {
                        "type": "object",
                        "properties": {
                            "provider": {"type": "string", "const": "aviationstack"},
                            "resource": {
                                "type": "string",
                                "enum": ["flights", "airports", "airlines", "routes", "airplanes"]
                            },
                            "page": {"type": ["number", "null"]},
                            "per_page": {"type": ["number", "null"]},
                            "total": {"type": ["number", "null"]}
                        }
                    },
                    "items": {"type": "array", "items": {"type": "object"}},
                    "raw": {"type": "object"}
                },
                "required": ["meta", "items", "raw"]
            },
            {
                "type": "object",
                "description": "Error response",
                "properties": {
                    "error": {
                        "type": "object",
                        "properties": {
                            "provider": {"type": "string"},
                            "code": {"type": ["string", "null"]},
                            "message": {"type": "string"},
                            "status_code": {"type": ["number", "null"]},
                            "retryable": {"type": "boolean"},
                            "rate_limited": {"type": "boolean"},
                            "retry_after_seconds": {"type": ["number", "null"]}
                        },
                        "required": ["provider", "message"]
                    }
                },
                "required": ["error"]
            }
        ]
    })
}
