//! SVG 文档提取
//!
//! 读取 SVG（XML）中的 `path` 与基本图形元素，解析并规范化为 [`StagingDocument`]。
//! 不处理 `transform`、文本、渐变和分组层级。

use crate::error::FileError;
use std::fmt;
use std::path::Path;
use svgdxf_core::math::Point2;
use svgdxf_core::path::{ParseError, PathParser};
use svgdxf_core::shape::{Shape, ShapePrimitive, Style};
use svgdxf_core::staging::{StagedPath, StagedShape, StagingDocument};

/// 不参与绘制的容器元素，其子树整体跳过
const NON_RENDERED: &[&str] = &["defs", "clipPath", "mask", "symbol", "pattern", "marker"];

/// 单条路径的解析失败
#[derive(Debug, Clone, PartialEq)]
pub struct PathFailure {
    /// 路径元素在文档中的序号（从 0 开始，含失败的路径）
    pub index: usize,
    pub id: Option<String>,
    pub error: ParseError,
}

impl fmt::Display for PathFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "path #{} (id={}): {}", self.index, id, self.error),
            None => write!(f, "path #{}: {}", self.index, self.error),
        }
    }
}

/// 提取结果：成功的元素进入中间文档，失败的路径单独收集
#[derive(Debug, Clone, PartialEq)]
pub struct SvgExtraction {
    pub document: StagingDocument,
    pub failures: Vec<PathFailure>,
}

/// 从文件提取
pub fn extract_svg(path: &Path) -> Result<SvgExtraction, FileError> {
    let text = std::fs::read_to_string(path)?;
    let mut extraction = extract_svg_str(&text)?;
    if let Some(name) = path.file_name() {
        extraction.document.source = Some(name.to_string_lossy().into_owned());
    }
    tracing::debug!(
        "extracted {} paths, {} shapes from {}",
        extraction.document.paths.len(),
        extraction.document.shapes.len(),
        path.display()
    );
    Ok(extraction)
}

/// 从 SVG 文本提取
pub fn extract_svg_str(text: &str) -> Result<SvgExtraction, FileError> {
    let xml = roxmltree::Document::parse(text)?;
    let root = xml.root_element();
    if root.tag_name().name() != "svg" {
        return Err(FileError::InvalidFormat(format!(
            "root element is <{}>, expected <svg>",
            root.tag_name().name()
        )));
    }

    let (width, height) = drawing_extent(root);
    let mut extractor = Extractor {
        document: StagingDocument::new(width, height),
        failures: Vec::new(),
        path_index: 0,
    };
    extractor.visit(root);

    Ok(SvgExtraction {
        document: extractor.document,
        failures: extractor.failures,
    })
}

struct Extractor {
    document: StagingDocument,
    failures: Vec<PathFailure>,
    path_index: usize,
}

impl Extractor {
    fn visit(&mut self, node: roxmltree::Node<'_, '_>) {
        for child in node.children().filter(|n| n.is_element()) {
            let tag = child.tag_name().name();
            if NON_RENDERED.contains(&tag) {
                continue;
            }
            match tag {
                "path" => self.visit_path(child),
                "rect" | "circle" | "ellipse" | "line" | "polyline" | "polygon" => {
                    if let Some(primitive) = shape_primitive(child) {
                        let shape = Shape::new(primitive).with_style(read_style(child));
                        self.document.shapes.push(
                            StagedShape::from_shape(&shape).with_id(element_id(child)),
                        );
                    }
                }
                _ => self.visit(child),
            }
        }
    }

    fn visit_path(&mut self, node: roxmltree::Node<'_, '_>) {
        let index = self.path_index;
        self.path_index += 1;

        let data = node.attribute("d").unwrap_or("");
        match PathParser::parse(data, Point2::origin()) {
            Ok(commands) if commands.is_empty() => {}
            Ok(commands) => self.document.paths.push(
                StagedPath::from_commands(&commands, read_style(node)).with_id(element_id(node)),
            ),
            Err(error) => {
                let failure = PathFailure {
                    index,
                    id: element_id(node),
                    error,
                };
                tracing::debug!("{failure}");
                self.failures.push(failure);
            }
        }
    }
}

fn element_id(node: roxmltree::Node<'_, '_>) -> Option<String> {
    node.attribute("id").map(str::to_string)
}

fn shape_primitive(node: roxmltree::Node<'_, '_>) -> Option<ShapePrimitive> {
    let num = |name: &str| number_attribute(node, name);
    let primitive = match node.tag_name().name() {
        "rect" => ShapePrimitive::Rect {
            origin: Point2::new(num("x"), num("y")),
            width: num("width"),
            height: num("height"),
            rx: num("rx"),
            ry: num("ry"),
        },
        "circle" => ShapePrimitive::Circle {
            center: Point2::new(num("cx"), num("cy")),
            radius: num("r"),
        },
        "ellipse" => ShapePrimitive::Ellipse {
            center: Point2::new(num("cx"), num("cy")),
            rx: num("rx"),
            ry: num("ry"),
        },
        "line" => ShapePrimitive::Line {
            start: Point2::new(num("x1"), num("y1")),
            end: Point2::new(num("x2"), num("y2")),
        },
        tag @ ("polyline" | "polygon") => ShapePrimitive::Polyline {
            points: parse_points(node.attribute("points").unwrap_or("")),
            closed: tag == "polygon",
        },
        _ => return None,
    };
    Some(primitive)
}

/// 数值属性；缺失为 0，无法解析时记录警告并取 0
fn number_attribute(node: roxmltree::Node<'_, '_>, name: &str) -> f64 {
    match node.attribute(name) {
        None => 0.0,
        Some(raw) => parse_length(raw).unwrap_or_else(|| {
            tracing::warn!(
                "ignoring invalid {name}=\"{raw}\" on <{}>",
                node.tag_name().name()
            );
            0.0
        }),
    }
}

/// 解析长度值，容忍单位后缀
pub fn parse_length(input: &str) -> Option<f64> {
    let s = input.trim();
    let s = s
        .trim_end_matches("px")
        .trim_end_matches("pt")
        .trim_end_matches("mm")
        .trim_end_matches("cm")
        .trim_end_matches("in")
        .trim();
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_number_list(input: &str) -> Vec<f64> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<f64>().ok())
        .collect()
}

/// `points` 属性；奇数个坐标时丢弃最后一个
fn parse_points(input: &str) -> Vec<Point2> {
    parse_number_list(input)
        .chunks_exact(2)
        .map(|pair| Point2::new(pair[0], pair[1]))
        .collect()
}

/// 绘图范围：优先 `viewBox`，否则 `width`/`height` 属性
fn drawing_extent(root: roxmltree::Node<'_, '_>) -> (Option<f64>, Option<f64>) {
    if let Some(view_box) = root.attribute("viewBox") {
        let values = parse_number_list(view_box);
        if let [_, _, w, h] = values.as_slice() {
            return (Some(*w), Some(*h));
        }
        tracing::warn!("ignoring malformed viewBox \"{view_box}\"");
    }
    (
        root.attribute("width").and_then(parse_length),
        root.attribute("height").and_then(parse_length),
    )
}

/// 样式：`style=""` 中的声明优先于同名表现属性
fn read_style(node: roxmltree::Node<'_, '_>) -> Style {
    let mut style = Style::default();
    if let Some(v) = node.attribute("fill") {
        style.fill = v.trim().to_string();
    }
    if let Some(v) = node.attribute("stroke") {
        style.stroke = v.trim().to_string();
    }
    if let Some(v) = node.attribute("stroke-width") {
        style.stroke_width = v.trim().to_string();
    }

    if let Some(inline) = node.attribute("style") {
        for declaration in inline.split(';') {
            let Some((name, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match name.trim() {
                "fill" => style.fill = value,
                "stroke" => style.stroke = value,
                "stroke-width" => style.stroke_width = value,
                _ => {}
            }
        }
    }
    style
}
