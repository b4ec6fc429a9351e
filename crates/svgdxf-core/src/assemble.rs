//! 实体装配
//!
//! 将转换后的实体组装配为 [`Document`]：
//! 1. 合并同一路径中首尾相接的三次样条（可选）
//! 2. 全局 y 轴翻转 `y' = height - y`，每个实体恰好翻转一次
//! 3. 按实体类型分配图层，按 (图层, 发现顺序) 稳定排序

use crate::convert::EntityGroup;
use crate::document::{Document, Layer, PlacedEntity};
use crate::error::AssemblyError;
use crate::geometry::{CadEntity, Spline};
use serde::{Deserialize, Serialize};

/// 装配选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyOptions {
    /// 按实体类型分层；关闭时全部放到图层 "0"
    pub layering: bool,
    /// 合并首尾相接的三次样条
    pub merge_splines: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            layering: true,
            merge_splines: true,
        }
    }
}

/// 实体装配器
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    options: AssemblyOptions,
}

impl Assembler {
    pub fn new(options: AssemblyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// 装配文档
    ///
    /// `height` 未知时返回 [`AssemblyError::MissingExtent`]，不做任何猜测。
    pub fn assemble(
        &self,
        groups: &[EntityGroup],
        width: Option<f64>,
        height: Option<f64>,
    ) -> Result<Document, AssemblyError> {
        let height = height.ok_or(AssemblyError::MissingExtent)?;
        if !height.is_finite() {
            return Err(AssemblyError::InvalidExtent(height));
        }

        let mut doc = Document::new(width, height, self.options.layering);
        for group in groups {
            let entities = if self.options.merge_splines {
                merge_splines(&group.entities)
            } else {
                group.entities.clone()
            };

            for entity in entities {
                let layer = if self.options.layering {
                    Layer::for_entity(&entity)
                } else {
                    Layer::Default
                };
                doc.entities.push(PlacedEntity {
                    layer,
                    entity: entity.flip_y(height),
                });
            }
        }

        // 稳定排序保留同一图层内的发现顺序
        doc.entities.sort_by_key(|placed| placed.layer);

        tracing::debug!(
            "assembled {} entities (height {}, layering {})",
            doc.len(),
            height,
            self.options.layering
        );
        Ok(doc)
    }
}

/// 合并相邻且首尾严格相等的三次样条，控制点不做任何改动
pub fn merge_splines(entities: &[CadEntity]) -> Vec<CadEntity> {
    let mut merged: Vec<CadEntity> = Vec::with_capacity(entities.len());

    for entity in entities {
        if let (Some(CadEntity::Spline(prev)), CadEntity::Spline(next)) = (merged.last_mut(), entity) {
            if joins(prev, next) {
                prev.append(next);
                continue;
            }
        }
        merged.push(entity.clone());
    }

    merged
}

fn joins(prev: &Spline, next: &Spline) -> bool {
    prev.degree == 3
        && next.degree == 3
        && prev.end_point().is_some()
        && prev.end_point() == next.start_point()
}
