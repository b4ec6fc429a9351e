//! 路径语法解析器
//!
//! 将 SVG 路径数据（`d` 属性）解析为绝对坐标的绘图指令序列。
//!
//! 支持的指令：
//! - 移动: `M/m`
//! - 直线: `L/l`、`H/h`、`V/v`
//! - 三次贝塞尔: `C/c`、`S/s`
//! - 二次贝塞尔: `Q/q`、`T/t`
//! - 椭圆弧: `A/a`
//! - 闭合: `Z/z`
//!
//! 小写指令为相对坐标，相对于当前光标（上一段的终点）。
//! 解析是"全有或全无"的：任何非法记号都会使整条路径失败。

use crate::math::Point2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 解析后的绘图指令（全部为绝对坐标）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo(Point2),
    LineTo(Point2),
    CubicTo {
        c1: Point2,
        c2: Point2,
        end: Point2,
    },
    QuadTo {
        c: Point2,
        end: Point2,
    },
    ArcTo {
        rx: f64,
        ry: f64,
        /// x 轴旋转角（度）
        rotation: f64,
        large_arc: bool,
        sweep: bool,
        end: Point2,
    },
    ClosePath,
}

impl PathCommand {
    /// 指令执行后的终点（`ClosePath` 没有显式终点）
    pub fn end_point(&self) -> Option<Point2> {
        match self {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => Some(*p),
            PathCommand::CubicTo { end, .. }
            | PathCommand::QuadTo { end, .. }
            | PathCommand::ArcTo { end, .. } => Some(*end),
            PathCommand::ClosePath => None,
        }
    }
}

/// 解析错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unknown command")]
    UnknownCommand,
    #[error("invalid number")]
    InvalidNumber,
    #[error("invalid arc flag")]
    InvalidFlag,
    #[error("missing argument")]
    MissingArgument,
    #[error("path must start with a move-to")]
    MissingMoveTo,
}

/// 解析错误，携带出错记号及其字节偏移
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: `{token}` at offset {position}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub token: String,
    pub position: usize,
}

impl ParseError {
    fn new(kind: ParseErrorKind, token: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            token: token.into(),
            position,
        }
    }
}

fn is_command_letter(c: char) -> bool {
    matches!(
        c,
        'M' | 'm' | 'L' | 'l' | 'H' | 'h' | 'V' | 'v' | 'C' | 'c' | 'S' | 's' | 'Q' | 'q' | 'T'
            | 't' | 'A' | 'a' | 'Z' | 'z'
    )
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

/// 词法分析器：按需读取指令字母、数字和弧标志
struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_separators(&mut self) {
        while let Some(c) = self.peek() {
            if !is_separator(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// 从 `start` 开始到下一个分隔符或指令字母的文本
    fn token_at(&self, start: usize) -> String {
        self.src[start..]
            .chars()
            .enumerate()
            .take_while(|(i, c)| !is_separator(*c) && (*i == 0 || !is_command_letter(*c)))
            .map(|(_, c)| c)
            .collect()
    }

    /// 下一个记号是否是数字的开头（用于隐式重复指令）
    fn at_number(&mut self) -> bool {
        self.skip_separators();
        matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
    }

    fn next_command(&mut self) -> Result<Option<(char, usize)>, ParseError> {
        self.skip_separators();
        let start = self.pos;
        match self.peek() {
            None => Ok(None),
            Some(c) if is_command_letter(c) => {
                self.pos += 1;
                Ok(Some((c, start)))
            }
            Some(_) => Err(ParseError::new(
                ParseErrorKind::UnknownCommand,
                self.token_at(start),
                start,
            )),
        }
    }

    /// 缺少参数时的错误（到达末尾或遇到下一条指令）
    fn missing_argument(&self, start: usize) -> ParseError {
        let token = self.peek().map(|c| c.to_string()).unwrap_or_default();
        ParseError::new(ParseErrorKind::MissingArgument, token, start)
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        self.skip_separators();
        let start = self.pos;
        let src = self.src;
        let bytes = src.as_bytes();

        match self.peek() {
            None => return Err(self.missing_argument(start)),
            Some(c) if is_command_letter(c) => return Err(self.missing_argument(start)),
            _ => {}
        }

        let mut end = start;
        if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
            end += 1;
        }
        let mut digits = 0;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
        if end < bytes.len() && bytes[end] == b'.' {
            end += 1;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return Err(ParseError::new(
                ParseErrorKind::InvalidNumber,
                self.token_at(start),
                start,
            ));
        }
        if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
            let mut exp_end = end + 1;
            if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
                exp_end += 1;
            }
            let exp_digits_start = exp_end;
            while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            if exp_end == exp_digits_start {
                return Err(ParseError::new(
                    ParseErrorKind::InvalidNumber,
                    self.token_at(start),
                    start,
                ));
            }
            end = exp_end;
        }

        let text = &src[start..end];
        let value = text.parse::<f64>().map_err(|_| {
            ParseError::new(ParseErrorKind::InvalidNumber, text, start)
        })?;
        self.pos = end;
        Ok(value)
    }

    fn flag(&mut self) -> Result<bool, ParseError> {
        self.skip_separators();
        let start = self.pos;
        match self.peek() {
            Some('0') => {
                self.pos += 1;
                Ok(false)
            }
            Some('1') => {
                self.pos += 1;
                Ok(true)
            }
            None => Err(self.missing_argument(start)),
            Some(c) if is_command_letter(c) => Err(self.missing_argument(start)),
            Some(_) => Err(ParseError::new(
                ParseErrorKind::InvalidFlag,
                self.token_at(start),
                start,
            )),
        }
    }
}

/// 解析过程中的游标状态
struct ParserState {
    cursor: Point2,
    subpath_start: Point2,
    /// 上一条三次曲线的第二控制点（用于 S/s 反射）
    last_cubic_ctrl: Option<Point2>,
    /// 上一条二次曲线的控制点（用于 T/t 反射）
    last_quad_ctrl: Option<Point2>,
    closed: bool,
    commands: Vec<PathCommand>,
}

impl ParserState {
    fn point(&self, lexer: &mut Lexer<'_>, relative: bool, base: Point2) -> Result<Point2, ParseError> {
        let x = lexer.number()?;
        let y = lexer.number()?;
        Ok(if relative {
            Point2::new(base.x + x, base.y + y)
        } else {
            Point2::new(x, y)
        })
    }

    fn push(&mut self, command: PathCommand) {
        if let Some(end) = command.end_point() {
            self.cursor = end;
        }
        self.commands.push(command);
    }
}

/// 反射控制点：`ctrl` 关于 `about` 的对称点
fn reflect(ctrl: Option<Point2>, about: Point2) -> Point2 {
    match ctrl {
        Some(c) => about + (about - c),
        None => about,
    }
}

/// 路径解析器
pub struct PathParser;

impl PathParser {
    /// 解析路径数据
    ///
    /// # 参数
    /// - `data`: 路径数据字符串
    /// - `cursor`: 初始光标位置（用于首个相对 `m`）
    ///
    /// # 返回
    /// 绝对坐标的指令序列。每个子路径都以恰好一个 `MoveTo` 开头；
    /// `ClosePath` 之后若紧跟非移动指令，会插入回到子路径起点的 `MoveTo`。
    pub fn parse(data: &str, cursor: Point2) -> Result<Vec<PathCommand>, ParseError> {
        let mut lexer = Lexer::new(data);
        let mut state = ParserState {
            cursor,
            subpath_start: cursor,
            last_cubic_ctrl: None,
            last_quad_ctrl: None,
            closed: false,
            commands: Vec::new(),
        };

        while let Some((letter, position)) = lexer.next_command()? {
            let relative = letter.is_ascii_lowercase();
            let upper = letter.to_ascii_uppercase();

            if state.commands.is_empty() && upper != 'M' {
                return Err(ParseError::new(
                    ParseErrorKind::MissingMoveTo,
                    letter.to_string(),
                    position,
                ));
            }
            if state.closed && upper != 'M' {
                // Z 之后隐式回到子路径起点
                let start = state.subpath_start;
                state.push(PathCommand::MoveTo(start));
            }
            state.closed = false;

            let mut cubic_ctrl = None;
            let mut quad_ctrl = None;

            match upper {
                'M' => {
                    let p = state.point(&mut lexer, relative, state.cursor)?;
                    state.push(PathCommand::MoveTo(p));
                    state.subpath_start = p;
                    while lexer.at_number() {
                        let p = state.point(&mut lexer, relative, state.cursor)?;
                        state.push(PathCommand::LineTo(p));
                    }
                }
                'L' => loop {
                    let p = state.point(&mut lexer, relative, state.cursor)?;
                    state.push(PathCommand::LineTo(p));
                    if !lexer.at_number() {
                        break;
                    }
                },
                'H' => loop {
                    let x = lexer.number()?;
                    let x = if relative { state.cursor.x + x } else { x };
                    let y = state.cursor.y;
                    state.push(PathCommand::LineTo(Point2::new(x, y)));
                    if !lexer.at_number() {
                        break;
                    }
                },
                'V' => loop {
                    let y = lexer.number()?;
                    let y = if relative { state.cursor.y + y } else { y };
                    let x = state.cursor.x;
                    state.push(PathCommand::LineTo(Point2::new(x, y)));
                    if !lexer.at_number() {
                        break;
                    }
                },
                'C' => loop {
                    let base = state.cursor;
                    let c1 = state.point(&mut lexer, relative, base)?;
                    let c2 = state.point(&mut lexer, relative, base)?;
                    let end = state.point(&mut lexer, relative, base)?;
                    state.push(PathCommand::CubicTo { c1, c2, end });
                    cubic_ctrl = Some(c2);
                    state.last_cubic_ctrl = cubic_ctrl;
                    if !lexer.at_number() {
                        break;
                    }
                },
                'S' => loop {
                    let base = state.cursor;
                    let c1 = reflect(state.last_cubic_ctrl, base);
                    let c2 = state.point(&mut lexer, relative, base)?;
                    let end = state.point(&mut lexer, relative, base)?;
                    state.push(PathCommand::CubicTo { c1, c2, end });
                    cubic_ctrl = Some(c2);
                    state.last_cubic_ctrl = cubic_ctrl;
                    if !lexer.at_number() {
                        break;
                    }
                },
                'Q' => loop {
                    let base = state.cursor;
                    let c = state.point(&mut lexer, relative, base)?;
                    let end = state.point(&mut lexer, relative, base)?;
                    state.push(PathCommand::QuadTo { c, end });
                    quad_ctrl = Some(c);
                    state.last_quad_ctrl = quad_ctrl;
                    if !lexer.at_number() {
                        break;
                    }
                },
                'T' => loop {
                    let base = state.cursor;
                    let c = reflect(state.last_quad_ctrl, base);
                    let end = state.point(&mut lexer, relative, base)?;
                    state.push(PathCommand::QuadTo { c, end });
                    quad_ctrl = Some(c);
                    state.last_quad_ctrl = quad_ctrl;
                    if !lexer.at_number() {
                        break;
                    }
                },
                'A' => loop {
                    let rx = lexer.number()?;
                    let ry = lexer.number()?;
                    let rotation = lexer.number()?;
                    let large_arc = lexer.flag()?;
                    let sweep = lexer.flag()?;
                    let end = state.point(&mut lexer, relative, state.cursor)?;
                    state.push(PathCommand::ArcTo {
                        rx,
                        ry,
                        rotation,
                        large_arc,
                        sweep,
                        end,
                    });
                    if !lexer.at_number() {
                        break;
                    }
                },
                'Z' => {
                    state.commands.push(PathCommand::ClosePath);
                    state.cursor = state.subpath_start;
                    state.closed = true;
                }
                _ => unreachable!("is_command_letter covers every letter"),
            }

            state.last_cubic_ctrl = cubic_ctrl;
            state.last_quad_ctrl = quad_ctrl;
        }

        Ok(state.commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(d: &str) -> Vec<PathCommand> {
        PathParser::parse(d, Point2::origin()).unwrap()
    }

    fn assert_point(p: Point2, x: f64, y: f64) {
        assert!((p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9, "{p:?} != ({x}, {y})");
    }

    #[test]
    fn test_absolute_move_line_close() {
        let cmds = parse("M 10 20 L 30 40 Z");
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[0], PathCommand::MoveTo(Point2::new(10.0, 20.0)));
        assert_eq!(cmds[1], PathCommand::LineTo(Point2::new(30.0, 40.0)));
        assert_eq!(cmds[2], PathCommand::ClosePath);
    }

    #[test]
    fn test_relative_uses_running_cursor() {
        let cmds = parse("m10,10 l5,0 l0,5");
        assert_point(cmds[1].end_point().unwrap(), 15.0, 10.0);
        assert_point(cmds[2].end_point().unwrap(), 15.0, 15.0);
    }

    #[test]
    fn test_implicit_lineto_after_move() {
        let cmds = parse("M0 0 10 0 10 10");
        assert_eq!(cmds.len(), 3);
        assert!(matches!(cmds[1], PathCommand::LineTo(_)));
        assert!(matches!(cmds[2], PathCommand::LineTo(_)));

        let rel = parse("m1 1 2 2");
        assert_point(rel[1].end_point().unwrap(), 3.0, 3.0);
    }

    #[test]
    fn test_horizontal_vertical() {
        let cmds = parse("M 5 5 H 20 v 10 h -5 V 0");
        assert_point(cmds[1].end_point().unwrap(), 20.0, 5.0);
        assert_point(cmds[2].end_point().unwrap(), 20.0, 15.0);
        assert_point(cmds[3].end_point().unwrap(), 15.0, 15.0);
        assert_point(cmds[4].end_point().unwrap(), 15.0, 0.0);
    }

    #[test]
    fn test_relative_cubic_controls_share_base() {
        let cmds = parse("M10 10 c 0 10 10 10 10 0");
        match cmds[1] {
            PathCommand::CubicTo { c1, c2, end } => {
                assert_point(c1, 10.0, 20.0);
                assert_point(c2, 20.0, 20.0);
                assert_point(end, 20.0, 10.0);
            }
            other => panic!("expected cubic, got {other:?}"),
        }
    }

    #[test]
    fn test_smooth_cubic_reflects_previous_control() {
        let cmds = parse("M0 0 C 0 10 10 10 10 0 S 20 -10 20 0");
        match cmds[2] {
            PathCommand::CubicTo { c1, .. } => assert_point(c1, 10.0, -10.0),
            other => panic!("expected cubic, got {other:?}"),
        }
    }

    #[test]
    fn test_smooth_quadratic_without_previous_uses_cursor() {
        let cmds = parse("M0 0 L 5 5 T 10 0");
        match cmds[2] {
            PathCommand::QuadTo { c, end } => {
                assert_point(c, 5.0, 5.0);
                assert_point(end, 10.0, 0.0);
            }
            other => panic!("expected quad, got {other:?}"),
        }
    }

    #[test]
    fn test_compact_numbers() {
        let cmds = parse("M10-5L.5.5");
        assert_point(cmds[0].end_point().unwrap(), 10.0, -5.0);
        assert_point(cmds[1].end_point().unwrap(), 0.5, 0.5);

        let exp = parse("M1e2,2E-1");
        assert_point(exp[0].end_point().unwrap(), 100.0, 0.2);
    }

    #[test]
    fn test_arc_relative_end_and_compact_flags() {
        let cmds = parse("M 10 10 a10 10 0 1150 50");
        match cmds[1] {
            PathCommand::ArcTo {
                rx,
                ry,
                rotation,
                large_arc,
                sweep,
                end,
            } => {
                assert_eq!((rx, ry, rotation), (10.0, 10.0, 0.0));
                assert!(large_arc);
                assert!(sweep);
                assert_point(end, 60.0, 60.0);
            }
            other => panic!("expected arc, got {other:?}"),
        }
    }

    #[test]
    fn test_close_then_draw_restarts_at_subpath_start() {
        let cmds = parse("M 10 10 L 20 10 L 20 20 Z l 5 5");
        assert_eq!(cmds[3], PathCommand::ClosePath);
        assert_eq!(cmds[4], PathCommand::MoveTo(Point2::new(10.0, 10.0)));
        assert_point(cmds[5].end_point().unwrap(), 15.0, 15.0);
    }

    #[test]
    fn test_unknown_command() {
        let err = PathParser::parse("M 0 0 X 10 10", Point2::origin()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownCommand);
        assert_eq!(err.token, "X");
        assert_eq!(err.position, 6);
    }

    #[test]
    fn test_wrong_argument_count() {
        let err = PathParser::parse("M 0 0 L 10", Point2::origin()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingArgument);

        let err = PathParser::parse("M 0 0 C 1 1 2 2 L 3 3", Point2::origin()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingArgument);
        assert_eq!(err.token, "L");
    }

    #[test]
    fn test_non_numeric_operand() {
        let err = PathParser::parse("M 0 0 L 10 #", Point2::origin()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidNumber);
        assert_eq!(err.token, "#");
        assert_eq!(err.position, 11);
    }

    #[test]
    fn test_invalid_arc_flag() {
        let err = PathParser::parse("M0 0 A 5 5 0 2 0 10 0", Point2::origin()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidFlag);
        assert_eq!(err.token, "2");
    }

    #[test]
    fn test_missing_move_to() {
        let err = PathParser::parse("L 10 10", Point2::origin()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingMoveTo);
    }

    #[test]
    fn test_empty_path_yields_no_commands() {
        assert!(parse("   ").is_empty());
    }
}
