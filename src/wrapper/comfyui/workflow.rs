//! 工作流输入参数 extra_pnginfo 解析
//!
//! 只解析定位节点所需的字段, 其余字段忽略, 缺失字段使用默认值

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct ExtraPnginfo {
    #[serde(default)]
    pub workflow: Option<Workflow>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct Workflow {
    #[serde(default)]
    pub nodes: Option<Vec<Node>>,
    /// [id, origin_id, origin_slot, target_id, target_slot, type] 或者对象形式
    #[serde(default)]
    pub links: Option<Vec<Value>>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct Node {
    /// 数字 id, 子图中也可能是字符串
    #[serde(default)]
    pub id: Value,
    #[serde(default, rename = "type", deserialize_with = "string_or_none")]
    pub node_type: Option<String>,
    /// 非字符串的标题视为没有标题
    #[serde(default, deserialize_with = "string_or_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub inputs: Option<Vec<Input>>,
    #[serde(default)]
    pub outputs: Option<Vec<Output>>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct Input {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub link: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct Output {
    #[serde(default)]
    pub links: Option<Vec<i64>>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// 节点 id 转换为 prompt 中使用的字符串 key
pub fn node_key(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

impl Workflow {
    pub fn nodes(&self) -> &[Node] {
        self.nodes.as_deref().unwrap_or_default()
    }

    /// 查找指定类型和 id 的节点
    pub fn find_node(&self, node_type: &str, key: &str) -> Option<&Node> {
        self.nodes().iter().find(|node| {
            node.node_type.as_deref() == Some(node_type) && node.key().as_deref() == Some(key)
        })
    }

    /// 按标题查找节点
    pub fn find_node_by_title(&self, title: &str) -> Option<&Node> {
        self.nodes()
            .iter()
            .find(|node| node.title.as_deref() == Some(title))
    }

    /// 查找产生该连线的上游节点
    pub fn link_origin(&self, link_id: i64) -> Option<String> {
        let from_outputs = self.nodes().iter().find_map(|node| {
            node.outputs
                .iter()
                .flatten()
                .any(|output| output.links.iter().flatten().any(|&l| l == link_id))
                .then(|| node.key())
                .flatten()
        });
        if from_outputs.is_some() {
            return from_outputs;
        }

        // 回退到顶层 links 表
        self.links.iter().flatten().find_map(|link| match link {
            Value::Array(items) if items.first().and_then(Value::as_i64) == Some(link_id) => {
                items.get(1).and_then(node_key)
            }
            Value::Object(map) if map.get("id").and_then(Value::as_i64) == Some(link_id) => {
                map.get("origin_id").and_then(node_key)
            }
            _ => None,
        })
    }
}

impl Node {
    pub fn key(&self) -> Option<String> {
        node_key(&self.id)
    }

    /// 指定名称输入口上的连线 id
    pub fn input_link(&self, name: &str) -> Option<i64> {
        self.inputs
            .iter()
            .flatten()
            .find(|input| input.name.as_deref() == Some(name))
            .and_then(|input| input.link)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_lenient() -> anyhow::Result<()> {
        let extra: ExtraPnginfo = serde_json::from_value(json!({
            "workflow": {
                "id": "abc",
                "nodes": [
                    {"id": 3, "type": "KSampler", "outputs": null, "pos": [0, 0]},
                    {"id": "7:2", "type": "Note", "title": "memo"},
                    {"id": 8, "type": 5, "title": 7}
                ]
            }
        }))?;

        let workflow = extra.workflow.unwrap();
        assert_eq!(workflow.nodes().len(), 3);
        assert_eq!(workflow.nodes()[0].key(), Some("3".to_string()));
        assert_eq!(workflow.nodes()[1].key(), Some("7:2".to_string()));
        assert!(workflow.find_node_by_title("memo").is_some());
        assert_eq!(workflow.nodes()[2].title, None);
        assert_eq!(workflow.nodes()[2].node_type, None);
        Ok(())
    }

    #[test]
    fn test_link_origin() -> anyhow::Result<()> {
        let workflow: Workflow = serde_json::from_value(json!({
            "nodes": [
                {"id": 1, "type": "Loader", "outputs": [{"links": [10, 11]}]},
                {"id": 2, "type": "Sink", "inputs": [{"name": "model", "link": 11}]}
            ],
            "links": [[12, 5, 0, 2, 1, "MODEL"], {"id": 13, "origin_id": 6}]
        }))?;

        assert_eq!(workflow.link_origin(11), Some("1".to_string()));
        assert_eq!(workflow.link_origin(12), Some("5".to_string()));
        assert_eq!(workflow.link_origin(13), Some("6".to_string()));
        assert_eq!(workflow.link_origin(99), None);

        let sink = workflow.find_node("Sink", "2").unwrap();
        assert_eq!(sink.input_link("model"), Some(11));
        assert_eq!(sink.input_link("clip"), None);
        Ok(())
    }
}
