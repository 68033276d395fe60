//! JSON-RPC operator console.
//!
//! Line-oriented `initialize` / `tools/list` / `tools/call` surface over a
//! [`JunctionSession`]. Tool results are returned as a single text content
//! block holding a JSON document.

use serde_json::{json, Value};

use junction_ir::parse::parse_direction;
use junction_ir::types::{Direction, GeoPoint, IncidentKind, RawTimingConfig};

use crate::incidents::IncidentEvent;
use crate::session::JunctionSession;

/// Handle a single JSON-RPC request and return a JSON-RPC response.
pub fn handle_request(req: &Value, session: &mut JunctionSession) -> Value {
    let id = req.get("id").cloned().unwrap_or(Value::Null);
    let method = req.get("method").and_then(|m| m.as_str()).unwrap_or("");

    match method {
        "initialize" => json_rpc_result(id, handle_initialize()),
        "tools/list" => json_rpc_result(id, handle_tools_list()),
        "tools/call" => {
            let params = req.get("params").cloned().unwrap_or(json!({}));
            json_rpc_result(id, handle_tools_call(&params, session))
        }
        _ => json_rpc_error(id, -32601, "Method not found"),
    }
}

/// Response for a line that is not valid JSON.
pub fn parse_error_response(message: &str) -> Value {
    json_rpc_error(Value::Null, -32700, message)
}

fn handle_initialize() -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "serverInfo": {
            "name": "junction-core",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": {}
        }
    })
}

fn direction_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "enum": ["north", "east", "south", "west"],
        "description": description,
    })
}

fn handle_tools_list() -> Value {
    json!({
        "tools": [
            {
                "name": "signal_status",
                "description": "Current direction, phase, countdown, mode and per-lamp congestion",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            },
            {
                "name": "signal_override",
                "description": "Manually hand the green to a direction",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "direction": direction_schema("Direction to serve next")
                    },
                    "required": ["direction"]
                }
            },
            {
                "name": "signal_emergency",
                "description": "Toggle emergency mode (north held green)",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            },
            {
                "name": "signal_reset",
                "description": "Leave manual or emergency control and resume the automatic cycle",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            },
            {
                "name": "signal_config",
                "description": "Apply timing settings; out-of-range values are clamped",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "baseTime": { "type": "integer", "description": "Base green seconds (10-60)" },
                        "congestionWeight": { "type": "integer", "description": "Seconds per congestion level (1-10)" },
                        "yellowTime": { "type": "integer", "description": "Yellow seconds (1-10)" }
                    }
                }
            },
            {
                "name": "signal_congestion",
                "description": "Set the congestion level (0-10) of a direction",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "direction": direction_schema("Approach to update"),
                        "level": { "type": "integer", "description": "Congestion level, clamped to 0-10" }
                    },
                    "required": ["direction", "level"]
                }
            },
            {
                "name": "signal_incident",
                "description": "Report an incident added to or removed from an approach, by direction or by location",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "direction": direction_schema("Approach the incident lies on"),
                        "location": {
                            "type": "object",
                            "description": "Where the incident was reported; classified by bearing from the junction centre",
                            "properties": {
                                "lat": { "type": "number" },
                                "lng": { "type": "number" }
                            },
                            "required": ["lat", "lng"]
                        },
                        "kind": {
                            "type": "string",
                            "enum": ["pothole", "accident", "ambulance"]
                        },
                        "removed": { "type": "boolean", "description": "True when the incident was cleared" }
                    },
                    "required": ["kind"]
                }
            }
        ]
    })
}

fn handle_tools_call(params: &Value, session: &mut JunctionSession) -> Value {
    let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    match tool_name {
        "signal_status" => tool_signal_status(session),
        "signal_override" => tool_signal_override(&arguments, session),
        "signal_emergency" => tool_signal_emergency(session),
        "signal_reset" => tool_signal_reset(session),
        "signal_config" => tool_signal_config(&arguments, session),
        "signal_congestion" => tool_signal_congestion(&arguments, session),
        "signal_incident" => tool_signal_incident(&arguments, session),
        _ => tool_error(format!("Unknown tool: {tool_name}")),
    }
}

fn tool_signal_status(session: &JunctionSession) -> Value {
    text_content(json!({
        "readout": session.readout(),
        "stats": session.stats(),
    }))
}

fn tool_signal_override(args: &Value, session: &mut JunctionSession) -> Value {
    let direction = match direction_arg(args) {
        Ok(d) => d,
        Err(e) => return tool_error(e),
    };
    let outcome = session.request_manual_override(direction);
    text_content(json!({
        "outcome": outcome,
        "applied": outcome.is_applied(),
        "readout": session.readout(),
    }))
}

fn tool_signal_emergency(session: &mut JunctionSession) -> Value {
    let active = session.toggle_emergency_mode();
    text_content(json!({
        "emergency": active,
        "readout": session.readout(),
    }))
}

fn tool_signal_reset(session: &mut JunctionSession) -> Value {
    session.reset_to_automatic();
    text_content(json!({ "readout": session.readout() }))
}

fn tool_signal_config(args: &Value, session: &mut JunctionSession) -> Value {
    let raw: RawTimingConfig = match serde_json::from_value(args.clone()) {
        Ok(raw) => raw,
        Err(e) => return tool_error(format!("Invalid timing settings: {e}")),
    };
    let applied = session.apply_config(&raw);
    text_content(json!({
        "applied": applied,
        "readout": session.readout(),
    }))
}

fn tool_signal_congestion(args: &Value, session: &mut JunctionSession) -> Value {
    let direction = match direction_arg(args) {
        Ok(d) => d,
        Err(e) => return tool_error(e),
    };
    let Some(level) = args.get("level").and_then(|v| v.as_i64()) else {
        return tool_error("Missing integer argument: level".to_string());
    };
    let stored = session.set_congestion(direction, level);
    text_content(json!({
        "direction": direction,
        "level": stored,
        "readout": session.readout(),
    }))
}

fn tool_signal_incident(args: &Value, session: &mut JunctionSession) -> Value {
    let direction = match args.get("location").cloned().map(serde_json::from_value::<GeoPoint>) {
        Some(Ok(location)) => session.classify(location),
        Some(Err(e)) => return tool_error(format!("Invalid location: {e}")),
        None => match direction_arg(args) {
            Ok(d) => d,
            Err(e) => return tool_error(e),
        },
    };
    let kind = match args
        .get("kind")
        .cloned()
        .map(serde_json::from_value::<IncidentKind>)
    {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => return tool_error(format!("Invalid incident kind: {e}")),
        None => return tool_error("Missing argument: kind".to_string()),
    };
    let removed = args.get("removed").and_then(|v| v.as_bool()).unwrap_or(false);
    let event = if removed {
        IncidentEvent::Removed { direction, kind }
    } else {
        IncidentEvent::Added { direction, kind }
    };
    session.handle_incident(&event);
    text_content(json!({
        "direction": direction,
        "incidents": session.incidents().count(direction),
        "level": session.congestion().level(direction),
        "readout": session.readout(),
    }))
}

fn direction_arg(args: &Value) -> Result<Direction, String> {
    let text = args
        .get("direction")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing argument: direction".to_string())?;
    parse_direction(text).map_err(|e| e.to_string())
}

fn text_content(body: Value) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": body.to_string()
        }]
    })
}

fn tool_error(message: String) -> Value {
    json!({
        "isError": true,
        "content": [{
            "type": "text",
            "text": json!({"error": message}).to_string()
        }]
    })
}

fn json_rpc_result(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result,
    })
}

fn json_rpc_error(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message,
        }
    })
}
