//! Request/response mapping between basalt-types and the Anthropic Messages
//! API wire format.
//!
//! Reference: <https://docs.anthropic.com/en/api/messages>

use basalt_types::{
    CompletionRequest, CompletionResponse, ContentBlock, ImageSource, Message, ProviderError, Role, StopReason,
    SystemBlock, SystemPrompt, ThinkingConfig, TokenUsage, ToolChoice, ToolDescriptor, ToolResultContent,
    ToolResultItem,
};

// ─── Request mapping ────────────────────────────────────────────────────────

/// Convert a [`CompletionRequest`] into the Anthropic Messages API JSON body.
///
/// The returned value does **not** include `"stream"` — callers add that key.
#[must_use]
pub fn to_api_request(req: &CompletionRequest, default_model: &str) -> serde_json::Value {
    let model = if req.model.is_empty() { default_model.to_string() } else { req.model.clone() };

    let mut body = serde_json::json!({
        "model": model,
        "messages": map_messages(&req.messages),
        "max_tokens": req.max_tokens,
    });

    if let Some(system) = &req.system {
        body["system"] = map_system_prompt(system);
    }

    if let Some(temp) = req.temperature {
        body["temperature"] = serde_json::Value::from(temp);
    }

    if !req.stop_sequences.is_empty() {
        body["stop_sequences"] =
            serde_json::Value::Array(req.stop_sequences.iter().map(|s| serde_json::Value::String(s.clone())).collect());
    }

    if !req.tools.is_empty() {
        body["tools"] = serde_json::Value::Array(req.tools.iter().map(map_tool_descriptor).collect());
    }

    if let Some(choice) = &req.tool_choice {
        body["tool_choice"] = map_tool_choice(choice);
    }

    // `thinking` wins when set explicitly; `enable_thinking` is a plain
    // opt-in with a sensible default budget (spec §6 `opts.enableThinking`).
    if let Some(thinking) = &req.thinking {
        body["thinking"] = map_thinking_config(thinking);
    } else if req.enable_thinking {
        body["thinking"] = map_thinking_config(&ThinkingConfig::Enabled { budget_tokens: 10_000 });
    }

    body
}

/// Map a list of [`Message`]s to Anthropic's message array format.
fn map_messages(messages: &[Message]) -> serde_json::Value {
    let arr: Vec<serde_json::Value> = messages
        .iter()
        .map(|msg| {
            let role_str = match msg.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            serde_json::json!({ "role": role_str, "content": map_content_blocks(&msg.content) })
        })
        .collect();
    serde_json::Value::Array(arr)
}

/// Map a slice of [`ContentBlock`]s to Anthropic's content array.
pub(crate) fn map_content_blocks(blocks: &[ContentBlock]) -> serde_json::Value {
    serde_json::Value::Array(blocks.iter().map(map_content_block).collect())
}

/// Map a single [`ContentBlock`] to its Anthropic JSON representation.
pub(crate) fn map_content_block(block: &ContentBlock) -> serde_json::Value {
    match block {
        ContentBlock::Text { text, .. } => serde_json::json!({ "type": "text", "text": text }),
        ContentBlock::Thinking { thinking, signature } => {
            serde_json::json!({ "type": "thinking", "thinking": thinking, "signature": signature })
        }
        ContentBlock::RedactedThinking { data } => serde_json::json!({ "type": "redacted_thinking", "data": data }),
        ContentBlock::ToolUse { id, name, input } => {
            serde_json::json!({ "type": "tool_use", "id": id, "name": name, "input": input })
        }
        ContentBlock::ToolResult { tool_use_id, content, is_error } => serde_json::json!({
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": map_tool_result_content(content),
            "is_error": is_error,
        }),
        ContentBlock::Image { source } => serde_json::json!({ "type": "image", "source": map_image_source(source) }),
    }
}

/// Map a [`ToolResultContent`] to Anthropic's tool_result content field: a
/// bare string for the common case, an array of typed items otherwise.
fn map_tool_result_content(content: &ToolResultContent) -> serde_json::Value {
    match content {
        ToolResultContent::Text(text) => serde_json::Value::String(text.clone()),
        ToolResultContent::Items(items) => serde_json::Value::Array(items.iter().map(map_tool_result_item).collect()),
    }
}

/// Map a [`ToolResultItem`] to its Anthropic JSON representation.
fn map_tool_result_item(item: &ToolResultItem) -> serde_json::Value {
    match item {
        ToolResultItem::Text { text } => serde_json::json!({ "type": "text", "text": text }),
        ToolResultItem::Image { source } => serde_json::json!({ "type": "image", "source": map_image_source(source) }),
    }
}

/// Map an [`ImageSource`] to Anthropic's image source format.
fn map_image_source(source: &ImageSource) -> serde_json::Value {
    match source {
        ImageSource::Base64 { media_type, data } => {
            serde_json::json!({ "type": "base64", "media_type": media_type, "data": data })
        }
        ImageSource::Url { url } => serde_json::json!({ "type": "url", "url": url }),
    }
}

/// Map a [`SystemPrompt`] to Anthropic's system field value.
fn map_system_prompt(system: &SystemPrompt) -> serde_json::Value {
    match system {
        SystemPrompt::Text(text) => serde_json::Value::String(text.clone()),
        SystemPrompt::Blocks(blocks) => {
            serde_json::Value::Array(blocks.iter().map(|b: &SystemBlock| serde_json::json!({ "type": "text", "text": b.text })).collect())
        }
    }
}

/// Map a [`ToolDescriptor`] to Anthropic's tool definition format.
fn map_tool_descriptor(tool: &ToolDescriptor) -> serde_json::Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.input_schema,
    })
}

/// Map a [`ToolChoice`] to Anthropic's tool_choice format.
fn map_tool_choice(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::Auto => serde_json::json!({ "type": "auto" }),
        ToolChoice::None => serde_json::json!({ "type": "none" }),
        ToolChoice::Required => serde_json::json!({ "type": "any" }),
        ToolChoice::Specific { name } => serde_json::json!({ "type": "tool", "name": name }),
    }
}

/// Map a [`ThinkingConfig`] to Anthropic's thinking object.
fn map_thinking_config(config: &ThinkingConfig) -> serde_json::Value {
    match config {
        ThinkingConfig::Enabled { budget_tokens } => serde_json::json!({ "type": "enabled", "budget_tokens": budget_tokens }),
        ThinkingConfig::Disabled => serde_json::json!({ "type": "disabled" }),
    }
}

// ─── Response mapping ───────────────────────────────────────────────────────

/// Parse an Anthropic Messages API response JSON into a [`CompletionResponse`].
///
/// # Errors
/// Returns [`ProviderError::InvalidRequest`] if required fields are missing
/// or malformed.
pub fn from_api_response(body: &serde_json::Value) -> Result<CompletionResponse, ProviderError> {
    let id = body["id"].as_str().ok_or_else(|| ProviderError::InvalidRequest("missing 'id' in response".into()))?.to_string();

    let model =
        body["model"].as_str().ok_or_else(|| ProviderError::InvalidRequest("missing 'model' in response".into()))?.to_string();

    let content_arr =
        body["content"].as_array().ok_or_else(|| ProviderError::InvalidRequest("missing 'content' array in response".into()))?;

    let mut content = Vec::with_capacity(content_arr.len());
    for block in content_arr {
        content.push(parse_content_block(block)?);
    }

    let usage = parse_usage(&body["usage"]);
    let stop_reason = body["stop_reason"].as_str().map(parse_stop_reason).unwrap_or(StopReason::EndTurn);

    Ok(CompletionResponse {
        id: id.clone(),
        model: model.clone(),
        message: Message {
            role: Role::Assistant,
            content,
            id: Some(id),
            model: Some(model),
            stop_reason: Some(stop_reason),
            usage: Some(usage),
        },
        usage,
        stop_reason,
    })
}

/// Parse a single content block from the Anthropic response JSON.
fn parse_content_block(block: &serde_json::Value) -> Result<ContentBlock, ProviderError> {
    let block_type =
        block["type"].as_str().ok_or_else(|| ProviderError::InvalidRequest("content block missing 'type'".into()))?;

    match block_type {
        "text" => {
            let text = block["text"]
                .as_str()
                .ok_or_else(|| ProviderError::InvalidRequest("text block missing 'text'".into()))?
                .to_string();
            Ok(ContentBlock::Text { text, citations: Vec::new() })
        }
        "thinking" => {
            let thinking = block["thinking"].as_str().unwrap_or_default().to_string();
            let signature = block["signature"].as_str().map(str::to_string);
            Ok(ContentBlock::Thinking { thinking, signature })
        }
        "redacted_thinking" => {
            let data = block["data"].as_str().unwrap_or_default().to_string();
            Ok(ContentBlock::RedactedThinking { data })
        }
        "tool_use" => {
            let id = block["id"].as_str().ok_or_else(|| ProviderError::InvalidRequest("tool_use block missing 'id'".into()))?.to_string();
            let name = block["name"]
                .as_str()
                .ok_or_else(|| ProviderError::InvalidRequest("tool_use block missing 'name'".into()))?
                .to_string();
            let input = block["input"].clone();
            Ok(ContentBlock::ToolUse { id, name, input })
        }
        other => Err(ProviderError::InvalidRequest(format!("unknown content block type: {other}"))),
    }
}

/// Parse [`TokenUsage`] from the Anthropic response `usage` field.
fn parse_usage(usage: &serde_json::Value) -> TokenUsage {
    TokenUsage {
        input_tokens: usage["input_tokens"].as_u64().unwrap_or(0),
        output_tokens: usage["output_tokens"].as_u64().unwrap_or(0),
        cache_read_tokens: usage["cache_read_input_tokens"].as_u64(),
        cache_creation_tokens: usage["cache_creation_input_tokens"].as_u64(),
    }
}

/// Map an Anthropic `stop_reason` string to a [`StopReason`].
fn parse_stop_reason(reason: &str) -> StopReason {
    match reason {
        "end_turn" => StopReason::EndTurn,
        "tool_use" => StopReason::ToolUse,
        "max_tokens" => StopReason::MaxTokens,
        "stop_sequence" => StopReason::StopSequence,
        "compaction" => StopReason::Compaction,
        _ => StopReason::EndTurn,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
