//! LoRA 信息追加到提示词
//!
//! 从 LoRA 加载节点的 prompt 参数中读取 `lora_<n>` 条目,
//! 以 `<lora:PATH:STRENGTH>` 的形式追加到文本末尾, 供保存图片时写入元数据。
//!
//! 目标节点的查找顺序:
//! 1. 本节点 `lora_loader_model` 输入口的连线上游
//! 2. 显式指定的 id
//! 3. 标题完全匹配的第一个节点

use std::{collections::HashSet, fmt, str::FromStr};

use lazy_static::lazy_static;
use log::{error, info};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

#[cfg(feature = "python")]
use pyo3::{
    pyclass, pymethods,
    types::{PyAnyMethods, PyDict, PyDictMethods, PyType},
    Bound, Py, PyAny, PyResult, Python,
};

use crate::{
    logic::is_truthy,
    wrapper::comfyui::workflow::{ExtraPnginfo, Workflow},
};
#[cfg(feature = "python")]
use crate::{
    core::category::CATEGORY_UTILS,
    wrapper::comfyui::types::{
        HIDDEN_EXTRA_PNGINFO, HIDDEN_PROMPT, HIDDEN_UNIQUE_ID, NODE_BOOLEAN, NODE_INT, NODE_MODEL,
        NODE_STRING,
    },
};

/// 节点注册名称, 用于在工作流中定位自身
pub const NODE_TYPE: &str = "AppendLorasToString";

/// 连接 LoRA 加载节点的输入口
pub const LORA_LOADER_INPUT: &str = "lora_loader_model";

lazy_static! {
    static ref LORA_KEY: Regex = Regex::new(r"^lora_\d+$").unwrap();
}

fn trace(enabled: bool, args: fmt::Arguments<'_>) {
    if enabled {
        info!("[{NODE_TYPE}] {args}");
    }
}

/// 强度截断到两位小数 (向零取整) 并格式化
///
/// 非有限值输出 `0.00`, 负数保留符号, 例如 `-0.005` 输出 `-0.00`
pub fn format_strength(value: f64) -> String {
    if !value.is_finite() {
        return "0.00".to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    let truncated = match Decimal::from_str(&abs.to_string()) {
        Ok(d) => {
            let mut d = d.trunc_with_scale(2);
            d.rescale(2);
            d.to_string()
        }
        // 超出 Decimal 表示范围
        Err(_) => format!("{:.2}", (abs * 100.0).trunc() / 100.0),
    };
    format!("{sign}{truncated}")
}

pub fn format_lora_token(path: &str, strength: f64) -> String {
    format!("<lora:{path}:{}>", format_strength(strength))
}

/// 保持首次出现顺序去重
pub fn ordered_unique<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// 解析强度, 缺失或无效时为 1.0
fn parse_strength(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(1.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(1.0),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 1.0,
    }
}

/// 查找 LoRA 加载节点的 id
pub fn find_target_node_id(
    workflow: &Workflow,
    unique_id: Option<&str>,
    id: u32,
    node_title: &str,
    debug: bool,
) -> Option<String> {
    let link_id = unique_id
        .and_then(|key| workflow.find_node(NODE_TYPE, key))
        .and_then(|node| node.input_link(LORA_LOADER_INPUT));

    if let Some(link_id) = link_id {
        let upstream = workflow.link_origin(link_id);
        trace(
            debug,
            format_args!("[priority: link] resolved upstream via link {link_id} -> {upstream:?}"),
        );
        if upstream.is_some() {
            return upstream;
        }
    }

    if id != 0 {
        trace(debug, format_args!("[priority: id] using provided id={id}"));
        return Some(id.to_string());
    }

    if !node_title.is_empty() {
        if let Some(node) = workflow.find_node_by_title(node_title) {
            let key = node.key();
            trace(
                debug,
                format_args!("[priority: title] matched '{node_title}' -> {key:?}"),
            );
            return key;
        }
        trace(debug, format_args!("no node matched title '{node_title}'"));
    }

    trace(debug, format_args!("could not resolve target node"));
    None
}

/// 从 prompt 中读取目标节点的 LoRA 条目
pub fn gather_lora_tokens(
    prompt: &Value,
    node_key: &str,
    only_enabled: bool,
    debug: bool,
) -> Vec<String> {
    let Some(inputs) = prompt
        .get(node_key)
        .and_then(|node| node.get("inputs"))
        .and_then(Value::as_object)
    else {
        trace(debug, format_args!("prompt has no inputs for node {node_key}"));
        return Vec::new();
    };

    let tokens = inputs.iter().filter_map(|(key, value)| {
        if !LORA_KEY.is_match(key) {
            return None;
        }
        let entry = value.as_object()?;

        if only_enabled && !entry.get("on").is_some_and(is_truthy) {
            trace(debug, format_args!("skipping {key} (disabled)"));
            return None;
        }

        let path = entry.get("lora").and_then(Value::as_str)?;
        if path.is_empty() {
            return None;
        }

        let token = format_lora_token(path, parse_strength(entry.get("strength")));
        trace(debug, format_args!("collected {key}: {token}"));
        Some(token)
    });

    ordered_unique(tokens)
}

/// 追加到文本末尾, 文本为空或以空格结尾时不再补空格
pub fn append_tokens(text: &str, tokens: &[String]) -> String {
    if tokens.is_empty() {
        return text.to_string();
    }
    let spacer = if text.is_empty() || text.ends_with(' ') {
        ""
    } else {
        " "
    };
    format!("{text}{spacer}{}", tokens.join(" "))
}

/// 模型已连接且按 id/标题查找时, 每次都重新执行
pub fn needs_refresh(model_linked: bool, id: i64, node_title: &str) -> bool {
    model_linked && (id != 0 || !node_title.is_empty())
}

/// LoRA 追加参数
#[derive(Debug, Default, Clone)]
pub struct AppendOptions {
    pub id: u32,
    pub node_title: String,
    pub only_enabled: bool,
    pub debug: bool,
}

/// LoRA 信息追加到提示词
#[cfg_attr(feature = "python", pyclass(subclass))]
pub struct AppendLorasToString {}

#[cfg(feature = "python")]
#[pymethods]
impl AppendLorasToString {
    #[new]
    fn new() -> Self {
        Self {}
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (&'static str,) {
        (NODE_STRING,)
    }

    #[classattr]
    #[pyo3(name = "RETURN_NAMES")]
    fn return_names() -> (&'static str,) {
        ("text",)
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_UTILS;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Reads LoRAs from a LoRA loader node (via link, id, or title) and appends them to the text as <lora:PATH:STRENGTH> tokens for metadata persistence."
    }

    #[classattr]
    #[pyo3(name = "FUNCTION")]
    const FUNCTION: &'static str = "execute";

    #[classmethod]
    #[pyo3(name = "INPUT_TYPES")]
    fn input_types(_cls: &Bound<'_, PyType>) -> PyResult<Py<PyDict>> {
        Python::with_gil(|py| {
            let dict = PyDict::new(py);
            dict.set_item("required", {
                let required = PyDict::new(py);
                required.set_item(
                    "text",
                    (NODE_STRING, {
                        let text = PyDict::new(py);
                        text.set_item("multiline", true)?;
                        text
                    }),
                )?;
                required
            })?;

            dict.set_item("optional", {
                let optional = PyDict::new(py);
                optional.set_item(
                    "id",
                    (NODE_INT, {
                        let id = PyDict::new(py);
                        id.set_item("default", 0)?;
                        id.set_item("min", 0)?;
                        id.set_item("max", 100000)?;
                        id.set_item("step", 1)?;
                        id.set_item("tooltip", "Node id of the LoRA loader, 0 to disable")?;
                        id
                    }),
                )?;
                optional.set_item(
                    "node_title",
                    (NODE_STRING, {
                        let title = PyDict::new(py);
                        title.set_item("multiline", false)?;
                        title.set_item("default", "")?;
                        title
                    }),
                )?;
                optional.set_item(LORA_LOADER_INPUT, (NODE_MODEL,))?;
                optional.set_item(
                    "only_enabled",
                    (NODE_BOOLEAN, {
                        let only_enabled = PyDict::new(py);
                        only_enabled.set_item("default", false)?;
                        only_enabled
                    }),
                )?;
                optional.set_item(
                    "debug",
                    (NODE_BOOLEAN, {
                        let debug = PyDict::new(py);
                        debug.set_item("default", false)?;
                        debug
                    }),
                )?;
                optional
            })?;

            dict.set_item("hidden", {
                let hidden = PyDict::new(py);
                hidden.set_item("extra_pnginfo", HIDDEN_EXTRA_PNGINFO)?;
                hidden.set_item("prompt", HIDDEN_PROMPT)?;
                hidden.set_item("unique_id", HIDDEN_UNIQUE_ID)?;
                hidden
            })?;

            Ok(dict.into())
        })
    }

    #[classmethod]
    #[pyo3(name = "IS_CHANGED", signature = (**kwargs))]
    fn is_changed(
        _cls: &Bound<'_, PyType>,
        kwargs: Option<Bound<'_, PyDict>>,
    ) -> PyResult<Option<f64>> {
        let Some(kwargs) = kwargs else {
            return Ok(None);
        };

        let model_linked = kwargs
            .get_item(LORA_LOADER_INPUT)?
            .is_some_and(|v| !v.is_none());
        let id = match kwargs.get_item("id")? {
            Some(v) => v.extract::<i64>().unwrap_or(0),
            None => 0,
        };
        let node_title = match kwargs.get_item("node_title")? {
            Some(v) => v.extract::<String>().unwrap_or_default(),
            None => String::new(),
        };

        if needs_refresh(model_linked, id, &node_title) {
            return Ok(Some(f64::NAN));
        }
        Ok(None)
    }

    #[pyo3(
        name = "execute",
        signature = (
            text,
            id = 0,
            node_title = String::new(),
            lora_loader_model = None,
            only_enabled = false,
            debug = false,
            extra_pnginfo = None,
            prompt = None,
            unique_id = None
        )
    )]
    #[allow(unused, clippy::too_many_arguments)]
    fn execute<'py>(
        &self,
        text: String,
        id: u32,
        node_title: String,
        lora_loader_model: Option<Bound<'py, PyAny>>,
        only_enabled: bool,
        debug: bool,
        extra_pnginfo: Option<Bound<'py, PyAny>>,
        prompt: Option<Bound<'py, PyAny>>,
        unique_id: Option<Bound<'py, PyAny>>,
    ) -> (String,) {
        let extra_pnginfo = extra_pnginfo.and_then(|v| to_json(&v, "extra_pnginfo"));
        let prompt = prompt.and_then(|v| to_json(&v, "prompt"));
        let unique_id = unique_id
            .filter(|v| !v.is_none())
            .and_then(|v| v.str().ok().map(|s| s.to_string()));

        let options = AppendOptions {
            id,
            node_title,
            only_enabled,
            debug,
        };
        (self.append(
            &text,
            extra_pnginfo.as_ref(),
            prompt.as_ref(),
            unique_id.as_deref(),
            &options,
        ),)
    }
}

#[cfg(feature = "python")]
fn to_json(obj: &Bound<'_, PyAny>, name: &str) -> Option<Value> {
    if obj.is_none() {
        return None;
    }
    match pythonize::depythonize::<Value>(obj) {
        Ok(v) => Some(v),
        Err(e) => {
            error!("{NODE_TYPE} failed to read {name}, {e}");
            None
        }
    }
}

impl AppendLorasToString {
    /// 追加 LoRA 信息, 任何异常都返回原文本
    pub fn append(
        &self,
        text: &str,
        extra_pnginfo: Option<&Value>,
        prompt: Option<&Value>,
        unique_id: Option<&str>,
        options: &AppendOptions,
    ) -> String {
        let debug = options.debug;
        trace(debug, format_args!("input text: {text:?}"));

        let workflow = match extra_pnginfo.cloned().map(serde_json::from_value::<ExtraPnginfo>) {
            Some(Ok(extra)) => extra.workflow.unwrap_or_default(),
            Some(Err(e)) => {
                error!("{NODE_TYPE} invalid workflow, {e}");
                return text.to_string();
            }
            None => Workflow::default(),
        };

        let Some(node_key) = find_target_node_id(
            &workflow,
            unique_id,
            options.id,
            &options.node_title,
            debug,
        ) else {
            trace(debug, format_args!("no target node, returning original text"));
            return text.to_string();
        };

        let tokens = match prompt {
            Some(prompt) => gather_lora_tokens(prompt, &node_key, options.only_enabled, debug),
            None => Vec::new(),
        };
        trace(debug, format_args!("target node {node_key}, tokens: {tokens:?}"));

        let output = append_tokens(text, &tokens);
        trace(debug, format_args!("output text: {output:?}"));
        output
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_workflow() -> Value {
        json!({
            "workflow": {
                "nodes": [
                    {"id": 4, "type": "Power Lora Loader (rgthree)", "title": "Loras A",
                     "outputs": [{"links": [21]}, {"links": null}]},
                    {"id": 5, "type": "Power Lora Loader (rgthree)", "title": "Loras B",
                     "outputs": [{"links": [22]}]},
                    {"id": 9, "type": "AppendLorasToString",
                     "inputs": [{"name": "lora_loader_model", "link": 21}]}
                ]
            }
        })
    }

    fn sample_prompt() -> Value {
        json!({
            "4": {"inputs": {
                "lora_1": {"on": true, "lora": "styles/ink.safetensors", "strength": 0.567},
                "lora_2": {"on": false, "lora": "detail.safetensors", "strength": "1.5"},
                "lora_3": {"on": true, "lora": "styles/ink.safetensors", "strength": 0.567},
                "lora_x": {"on": true, "lora": "ignored.safetensors"},
                "lora_4": "not an object",
                "lora_5": {"on": true, "lora": ""},
                "model": ["1", 0]
            }},
            "5": {"inputs": {
                "lora_1": {"on": true, "lora": "b.safetensors", "strength": -0.005}
            }}
        })
    }

    #[test]
    fn test_format_strength() {
        assert_eq!(format_strength(0.567), "0.56");
        assert_eq!(format_strength(0.29), "0.29");
        assert_eq!(format_strength(1.0), "1.00");
        assert_eq!(format_strength(-1.239), "-1.23");
        assert_eq!(format_strength(-0.005), "-0.00");
        assert_eq!(format_strength(f64::NAN), "0.00");
        assert_eq!(format_strength(f64::INFINITY), "0.00");
        assert_eq!(format_lora_token("a/b.safetensors", 0.8), "<lora:a/b.safetensors:0.80>");
    }

    #[test]
    fn test_parse_strength() {
        assert_eq!(parse_strength(None), 1.0);
        assert_eq!(parse_strength(Some(&json!(null))), 1.0);
        assert_eq!(parse_strength(Some(&json!(" 0.25 "))), 0.25);
        assert_eq!(parse_strength(Some(&json!("abc"))), 1.0);
        assert_eq!(parse_strength(Some(&json!(false))), 0.0);
        assert_eq!(parse_strength(Some(&json!(2))), 2.0);
    }

    #[test]
    fn test_ordered_unique() {
        let items = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(ordered_unique(items), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_gather_tokens() {
        let prompt = sample_prompt();
        assert_eq!(
            gather_lora_tokens(&prompt, "4", false, false),
            vec![
                "<lora:styles/ink.safetensors:0.56>",
                "<lora:detail.safetensors:1.50>"
            ]
        );
        assert_eq!(
            gather_lora_tokens(&prompt, "4", true, false),
            vec!["<lora:styles/ink.safetensors:0.56>"]
        );
        assert!(gather_lora_tokens(&prompt, "7", false, false).is_empty());
    }

    #[test]
    fn test_append_tokens_spacer() {
        let tokens = vec!["<lora:a:1.00>".to_string(), "<lora:b:0.50>".to_string()];
        assert_eq!(append_tokens("", &tokens), "<lora:a:1.00> <lora:b:0.50>");
        assert_eq!(append_tokens("cat ", &tokens), "cat <lora:a:1.00> <lora:b:0.50>");
        assert_eq!(append_tokens("cat", &tokens), "cat <lora:a:1.00> <lora:b:0.50>");
        assert_eq!(append_tokens("cat", &[]), "cat");
    }

    #[test]
    fn test_resolution_precedence() -> anyhow::Result<()> {
        let extra: ExtraPnginfo = serde_json::from_value(sample_workflow())?;
        let workflow = extra.workflow.unwrap_or_default();

        // 连线优先于 id 和标题
        assert_eq!(
            find_target_node_id(&workflow, Some("9"), 5, "Loras B", false),
            Some("4".to_string())
        );
        assert_eq!(
            find_target_node_id(&workflow, Some("1"), 5, "Loras A", false),
            Some("5".to_string())
        );
        assert_eq!(
            find_target_node_id(&workflow, None, 0, "Loras B", false),
            Some("5".to_string())
        );
        assert_eq!(find_target_node_id(&workflow, None, 0, "missing", false), None);
        assert_eq!(find_target_node_id(&workflow, None, 0, "", false), None);
        Ok(())
    }

    #[test]
    fn test_append() {
        let node = AppendLorasToString {};
        let extra = sample_workflow();
        let prompt = sample_prompt();

        let output = node.append(
            "a portrait",
            Some(&extra),
            Some(&prompt),
            Some("9"),
            &AppendOptions {
                only_enabled: true,
                ..Default::default()
            },
        );
        assert_eq!(output, "a portrait <lora:styles/ink.safetensors:0.56>");

        let output = node.append(
            "x",
            None,
            Some(&prompt),
            None,
            &AppendOptions {
                id: 5,
                ..Default::default()
            },
        );
        assert_eq!(output, "x <lora:b.safetensors:-0.00>");
    }

    #[test]
    fn test_append_malformed_input_returns_text() {
        let node = AppendLorasToString {};
        let options = AppendOptions {
            id: 4,
            debug: true,
            ..Default::default()
        };

        let extra = json!({"workflow": {"nodes": "oops"}});
        assert_eq!(node.append("text", Some(&extra), Some(&json!([1, 2])), None, &options), "text");
        // 工作流损坏时不回退到 id
        assert_eq!(
            node.append("text", Some(&extra), Some(&sample_prompt()), Some("9"), &options),
            "text"
        );
        assert_eq!(node.append("text", None, None, None, &options), "text");
        assert_eq!(
            node.append("text", None, None, None, &AppendOptions::default()),
            "text"
        );
    }

    #[test]
    fn test_append_keeps_link_with_odd_node_fields() {
        let node = AppendLorasToString {};
        let extra = json!({"workflow": {"nodes": [
            {"id": 4, "type": "Power Lora Loader", "title": "Loras A", "outputs": [{"links": [21]}]},
            {"id": 6, "type": "Note", "title": 7},
            {"id": 9, "type": "AppendLorasToString", "title": ["x"],
             "inputs": [{"name": "lora_loader_model", "link": 21}]}
        ]}});
        let prompt = json!({
            "4": {"inputs": {"lora_1": {"on": true, "lora": "bylink.safetensors", "strength": 1.0}}},
            "5": {"inputs": {"lora_1": {"on": true, "lora": "byid.safetensors", "strength": 1.0}}}
        });

        let output = node.append(
            "t",
            Some(&extra),
            Some(&prompt),
            Some("9"),
            &AppendOptions {
                id: 5,
                ..Default::default()
            },
        );
        assert_eq!(output, "t <lora:bylink.safetensors:1.00>");
    }

    #[test]
    fn test_needs_refresh() {
        assert!(needs_refresh(true, 3, ""));
        assert!(needs_refresh(true, 0, "Loras"));
        assert!(!needs_refresh(true, 0, ""));
        assert!(!needs_refresh(false, 3, "Loras"));
    }
}
