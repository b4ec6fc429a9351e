//! DXF 输出
//!
//! 将装配好的 [`Document`] 写为 AutoCAD R2010 DXF。
//! 写入先落到目标目录下的临时文件，成功后原子重命名。

use crate::error::FileError;
use std::io::{BufWriter, Write};
use std::path::Path;
use svgdxf_core::document::{Document, Layer};
use svgdxf_core::geometry::CadEntity;
use svgdxf_core::math::Point2;

/// 输出文件声明的 DXF 版本
pub const TARGET_VERSION: dxf::enums::AcadVersion = dxf::enums::AcadVersion::R2010;

/// 图层颜色（AutoCAD 颜色索引）
fn layer_color(layer: Layer) -> u8 {
    match layer {
        Layer::Lines => 7,  // 白
        Layer::Curves => 3, // 绿
        Layer::Shapes => 4, // 青
        Layer::Paths => 2,  // 黄
        Layer::Default => 7,
    }
}

fn point(p: &Point2) -> dxf::Point {
    dxf::Point::new(p.x, p.y, 0.0)
}

/// 构建 DXF 图纸
pub fn build_drawing(document: &Document) -> dxf::Drawing {
    let mut drawing = dxf::Drawing::new();
    drawing.header.version = TARGET_VERSION;

    let extent = document.extent();
    drawing.header.minimum_drawing_extents = point(&extent.min);
    drawing.header.maximum_drawing_extents = point(&extent.max);

    // 导出图层
    for layer in document.layers() {
        if drawing.layers().any(|l| l.name == layer.name()) {
            continue;
        }
        let mut dxf_layer = dxf::tables::Layer::default();
        dxf_layer.name = layer.name().to_string();
        dxf_layer.color = dxf::Color::from_index(layer_color(layer));
        drawing.add_layer(dxf_layer);
    }

    // 导出实体（文档中已按图层排序）
    for placed in &document.entities {
        let mut dxf_entity = dxf::entities::Entity::new(convert_to_dxf_entity(&placed.entity));
        dxf_entity.common.layer = placed.layer.name().to_string();
        drawing.add_entity(dxf_entity);
    }

    drawing
}

/// 将 CAD 实体转换为 DXF 实体
fn convert_to_dxf_entity(entity: &CadEntity) -> dxf::entities::EntityType {
    match entity {
        CadEntity::Line(line) => {
            let mut dxf_line = dxf::entities::Line::default();
            dxf_line.p1 = point(&line.start);
            dxf_line.p2 = point(&line.end);
            dxf::entities::EntityType::Line(dxf_line)
        }

        CadEntity::Polyline(polyline) => {
            let mut lwpoly = dxf::entities::LwPolyline::default();
            lwpoly.set_is_closed(polyline.closed);
            lwpoly.vertices = polyline
                .points
                .iter()
                .map(|p| {
                    let mut vertex = dxf::LwPolylineVertex::default();
                    vertex.x = p.x;
                    vertex.y = p.y;
                    vertex
                })
                .collect();
            dxf::entities::EntityType::LwPolyline(lwpoly)
        }

        CadEntity::Spline(spline) => {
            let mut dxf_spline = dxf::entities::Spline::default();
            dxf_spline.degree_of_curve = spline.degree as i32;
            dxf_spline.knot_values = spline.knot_vector();
            dxf_spline.control_points = spline.control_points.iter().map(point).collect();
            dxf::entities::EntityType::Spline(dxf_spline)
        }

        CadEntity::Circle(circle) => {
            let mut dxf_circle = dxf::entities::Circle::default();
            dxf_circle.center = point(&circle.center);
            dxf_circle.radius = circle.radius;
            dxf::entities::EntityType::Circle(dxf_circle)
        }

        CadEntity::Ellipse(ellipse) => {
            let mut dxf_ellipse = dxf::entities::Ellipse::default();
            dxf_ellipse.center = point(&ellipse.center);
            dxf_ellipse.major_axis =
                dxf::Vector::new(ellipse.major_axis.x, ellipse.major_axis.y, 0.0);
            dxf_ellipse.minor_axis_ratio = ellipse.minor_ratio;
            dxf_ellipse.start_parameter = 0.0;
            dxf_ellipse.end_parameter = std::f64::consts::TAU;
            dxf::entities::EntityType::Ellipse(dxf_ellipse)
        }

        CadEntity::Arc(arc) => {
            let mut dxf_arc = dxf::entities::Arc::default();
            dxf_arc.center = point(&arc.center);
            dxf_arc.radius = arc.radius;
            dxf_arc.start_angle = arc.start_angle;
            dxf_arc.end_angle = arc.end_angle;
            dxf::entities::EntityType::Arc(dxf_arc)
        }
    }
}

/// 写入任意输出流
pub fn write_dxf(document: &Document, writer: &mut impl Write) -> Result<(), FileError> {
    build_drawing(document)
        .save(writer)
        .map_err(|e| FileError::Dxf(e.to_string()))
}

/// 原子地保存到文件，返回写入的字节数
///
/// 失败时目标路径保持不变，临时文件随之删除。
pub fn save_dxf(document: &Document, path: &Path) -> Result<u64, FileError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".svgdxf-")
        .suffix(".dxf.tmp")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(&mut temp);
        write_dxf(document, &mut writer)?;
        writer.flush()?;
    }
    let size = temp.as_file().metadata()?.len();
    temp.persist(path).map_err(|e| FileError::Io(e.error))?;

    tracing::debug!(
        "Saved {} entities to {} ({} bytes)",
        document.len(),
        path.display(),
        size
    );
    Ok(size)
}

/// 读取 DXF 文件
pub fn load_dxf(path: &Path) -> Result<dxf::Drawing, FileError> {
    dxf::Drawing::load_file(path).map_err(|e| FileError::Dxf(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use svgdxf_core::assemble::{Assembler, AssemblyOptions};
    use svgdxf_core::convert::convert_staging;
    use svgdxf_core::path::PathParser;
    use svgdxf_core::shape::{Shape, ShapePrimitive, Style};
    use svgdxf_core::staging::{StagedPath, StagedShape, StagingDocument};

    fn sample_document(options: AssemblyOptions) -> Document {
        let mut staging = StagingDocument::new(Some(200.0), Some(100.0));
        let commands = PathParser::parse(
            "M10 10 L60 10 C 70 10 80 20 80 30 C 80 40 70 50 60 50 A 20 20 0 0 1 20 50 A 30 10 0 0 1 10 10",
            Point2::origin(),
        )
        .unwrap();
        staging
            .paths
            .push(StagedPath::from_commands(&commands, Style::default()));
        staging.shapes.push(StagedShape::from_shape(&Shape::new(ShapePrimitive::Circle {
            center: Point2::new(150.0, 40.0),
            radius: 12.5,
        })));
        staging.shapes.push(StagedShape::from_shape(&Shape::new(ShapePrimitive::Ellipse {
            center: Point2::new(150.0, 80.0),
            rx: 20.0,
            ry: 10.0,
        })));

        let output = convert_staging(&staging);
        assert!(output.failures.is_empty());
        Assembler::new(options)
            .assemble(&output.groups, staging.view_box_width, staging.view_box_height)
            .unwrap()
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.dxf");
        let doc = sample_document(AssemblyOptions::default());

        let size = save_dxf(&doc, &path).unwrap();
        assert!(size > 0);
        // 没有遗留临时文件
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let drawing = load_dxf(&path).unwrap();
        assert_eq!(drawing.header.version, TARGET_VERSION);
        assert_eq!(drawing.header.maximum_drawing_extents.x, 200.0);
        assert_eq!(drawing.header.maximum_drawing_extents.y, 100.0);

        let layer_names: Vec<String> = drawing.layers().map(|l| l.name.clone()).collect();
        for name in ["LINES", "CURVES", "SHAPES", "PATHS"] {
            assert!(layer_names.iter().any(|n| n == name), "missing layer {name}");
        }

        let entities: Vec<&dxf::entities::Entity> = drawing.entities().collect();
        assert_eq!(entities.len(), doc.len());

        let mut splines = 0;
        for entity in &entities {
            match &entity.specific {
                dxf::entities::EntityType::Line(line) => {
                    assert_eq!(entity.common.layer, "LINES");
                    // y 轴已翻转：源 (10,10) → (10,90)
                    assert_eq!(line.p1.y, 90.0);
                }
                dxf::entities::EntityType::Spline(spline) => {
                    splines += 1;
                    assert_eq!(entity.common.layer, "CURVES");
                    assert_eq!(spline.control_points.len(), 7);
                    assert_eq!(
                        spline.knot_values.len(),
                        spline.control_points.len() + 4
                    );
                }
                dxf::entities::EntityType::Arc(arc) => {
                    assert_eq!(entity.common.layer, "PATHS");
                    assert!((arc.radius - 20.0).abs() < 1e-9);
                }
                dxf::entities::EntityType::LwPolyline(poly) => {
                    assert_eq!(entity.common.layer, "CURVES");
                    assert_eq!(poly.vertices.len(), 21);
                }
                dxf::entities::EntityType::Circle(circle) => {
                    assert_eq!(entity.common.layer, "SHAPES");
                    assert_eq!(circle.radius, 12.5);
                    assert_eq!(circle.center.y, 60.0);
                }
                dxf::entities::EntityType::Ellipse(ellipse) => {
                    assert_eq!(entity.common.layer, "SHAPES");
                    assert!((ellipse.minor_axis_ratio - 0.5).abs() < 1e-12);
                }
                other => panic!("unexpected entity {other:?}"),
            }
        }
        assert_eq!(splines, 1);
    }

    #[test]
    fn test_single_layer_when_layering_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.dxf");
        let doc = sample_document(AssemblyOptions {
            layering: false,
            merge_splines: false,
        });
        save_dxf(&doc, &path).unwrap();

        let drawing = load_dxf(&path).unwrap();
        assert!(drawing.entities().all(|e| e.common.layer == "0"));
        assert_eq!(
            drawing
                .entities()
                .filter(|e| matches!(e.specific, dxf::entities::EntityType::Spline(_)))
                .count(),
            2
        );
    }

    #[test]
    fn test_failed_save_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.dxf");
        let doc = sample_document(AssemblyOptions::default());
        assert!(save_dxf(&doc, &path).is_err());
        assert!(!path.exists());
    }
}
