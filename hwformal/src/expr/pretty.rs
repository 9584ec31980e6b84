//! Pretty printing of [`Sym`] through `pretty` documents, colored with termcolor on
//! terminals and plain everywhere else.
//!
//! Only the parentheses needed to restore the tree are printed: binary operators are
//! left-associative, so `a - (b - c)` keeps its parentheses while `(a - b) - c`
//! prints as `a - b - c`.
use std::io::{self, Write};

use num_bigint::Sign;
use pretty::{FmtWrite, RcDoc, RenderAnnotated};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::expr::{BinaryOp, LogicOp, Sym, UnaryOp};
use crate::value::format_real;

/// Styles used to annotate parts of the pretty-printed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Punct, // commas, brackets
    /// Parentheses are colored by nesting depth so matching pairs share a color.
    Paren(u8),
    Keyword,  // if, then, else, true, false
    Operator, // +, <<, ==, &&
    Ident,    // variables and call names
    Literal,  // numeric constants
}

impl Style {
    fn to_color_spec(self) -> ColorSpec {
        let mut s = ColorSpec::new();
        match self {
            Style::Punct => {
                s.set_dimmed(true);
            }
            Style::Paren(depth) => {
                let fg = match depth % 6 {
                    0 => Color::Blue,
                    1 => Color::Green,
                    2 => Color::White,
                    3 => Color::Yellow,
                    4 => Color::Red,
                    _ => Color::Magenta,
                };
                s.set_fg(Some(fg)).set_dimmed(true);
            }
            Style::Keyword => {
                s.set_fg(Some(Color::Cyan)).set_bold(true);
            }
            Style::Operator => {
                s.set_fg(Some(Color::Yellow)).set_bold(true);
            }
            Style::Ident => {
                s.set_fg(Some(Color::Green)).set_bold(true);
            }
            Style::Literal => {
                s.set_fg(Some(Color::Magenta));
            }
        }
        s
    }
}

type Doc = RcDoc<'static, Style>;

fn styled(style: Style, s: &'static str) -> Doc {
    RcDoc::as_string(s).annotate(style)
}

fn punct(s: &'static str) -> Doc {
    styled(Style::Punct, s)
}

#[inline]
fn lparen(depth: u8) -> Doc {
    RcDoc::as_string("(").annotate(Style::Paren(depth))
}

#[inline]
fn rparen(depth: u8) -> Doc {
    RcDoc::as_string(")").annotate(Style::Paren(depth))
}

fn kw(s: &'static str) -> Doc {
    styled(Style::Keyword, s)
}

fn op(s: &'static str) -> Doc {
    styled(Style::Operator, s)
}

fn ident(name: &str) -> Doc {
    RcDoc::as_string(name.to_string()).annotate(Style::Ident)
}

/// Binding strength; larger binds tighter.
fn precedence(e: &Sym) -> u8 {
    match e {
        Sym::If(..) => 1,
        Sym::Logic(LogicOp::Or, _) => 2,
        Sym::Logic(LogicOp::And, _) => 3,
        Sym::Not(_) => 4,
        Sym::Eq(..) | Sym::Cmp(..) => 5,
        Sym::Binary(op, ..) => match op {
            BinaryOp::BitOr => 6,
            BinaryOp::BitXor => 7,
            BinaryOp::BitAnd => 8,
            BinaryOp::Shl | BinaryOp::Shr => 9,
            BinaryOp::Add | BinaryOp::Sub => 10,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::FloorDiv => 11,
            BinaryOp::Pow => 13,
        },
        Sym::Unary(..) => 12,
        Sym::Const(v) if v.sign() == Sign::Minus => 12,
        Sym::Const(_) | Sym::Var(_) | Sym::Index(..) | Sym::Tuple(_) | Sym::Bool(_) | Sym::Call(..) => 255,
    }
}

/// Render `e` as an operand of an operator with precedence `parent`. `strict` asks for
/// parentheses on equal precedence too (right operand of a left-associative operator).
fn operand(e: &Sym, parent: u8, strict: bool, depth: u8) -> Doc {
    let current = precedence(e);
    if current < parent || (strict && current == parent) {
        lparen(depth)
            .append(to_doc_with_depth(e, depth + 1))
            .append(rparen(depth))
            .group()
    } else {
        to_doc_with_depth(e, depth)
    }
}

fn infix(lhs: &Sym, symbol: &'static str, rhs: &Sym, prec: u8, depth: u8) -> Doc {
    operand(lhs, prec, false, depth)
        .append(RcDoc::space())
        .append(op(symbol))
        .append(RcDoc::line())
        .append(operand(rhs, prec, true, depth))
        .group()
}

fn comma_list<'e>(items: impl Iterator<Item = &'e Sym>, depth: u8) -> Doc {
    RcDoc::intersperse(
        items.map(|x| to_doc_with_depth(x, depth)),
        punct(",").append(RcDoc::line()),
    )
}

/// Depth-aware conversion that colors parentheses by nesting level.
fn to_doc_with_depth(e: &Sym, depth: u8) -> Doc {
    let prec = precedence(e);
    match e {
        Sym::Const(v) => RcDoc::as_string(format_real(v)).annotate(Style::Literal),
        Sym::Var(name) => ident(name),
        Sym::Bool(true) => kw("true"),
        Sym::Bool(false) => kw("false"),
        Sym::Index(base, i) => operand(base, prec, false, depth)
            .append(punct("["))
            .append(RcDoc::as_string(*i).annotate(Style::Literal))
            .append(punct("]")),
        Sym::Tuple(items) => {
            let mut doc = lparen(depth).append(comma_list(items.iter(), depth + 1));
            if items.len() == 1 {
                doc = doc.append(punct(","));
            }
            doc.append(rparen(depth)).group()
        }
        Sym::Call(name, args) => ident(name)
            .append(lparen(depth))
            .append(comma_list(args.iter(), depth + 1))
            .append(rparen(depth))
            .group(),
        Sym::Binary(bop, a, b) => infix(a, bop.symbol(), b, prec, depth),
        Sym::Unary(uop, a) => {
            let symbol = match uop {
                UnaryOp::Neg => "-",
                UnaryOp::Invert => "~",
            };
            op(symbol).append(operand(a, prec, true, depth)).group()
        }
        Sym::Eq(a, b) => infix(a, "==", b, prec, depth),
        Sym::Cmp(cop, a, b) => infix(a, cop.symbol(), b, prec, depth),
        Sym::Logic(lop, items) => {
            let symbol = match lop {
                LogicOp::And => "&&",
                LogicOp::Or => "||",
            };
            if items.is_empty() {
                return kw(if lop.identity() { "true" } else { "false" });
            }
            RcDoc::intersperse(
                items.iter().map(|x| operand(x, prec, true, depth)),
                RcDoc::space().append(op(symbol)).append(RcDoc::line()),
            )
            .group()
        }
        Sym::Not(a) => op("!").append(operand(a, prec, false, depth)).group(),
        Sym::If(c, t, f) => kw("if")
            .append(RcDoc::space())
            .append(operand(c, prec, true, depth))
            .append(RcDoc::line())
            .append(kw("then"))
            .append(RcDoc::space())
            .append(operand(t, prec, true, depth))
            .append(RcDoc::line())
            .append(kw("else"))
            .append(RcDoc::space())
            .append(operand(f, prec, false, depth))
            .group()
            .nest(2),
    }
}

// Forwards text to `out`, switching colors on annotations.
struct ColorWriter<'w, W: WriteColor + Write> {
    out: &'w mut W,
}

impl<'a, 'w, W: WriteColor + Write> RenderAnnotated<'a, Style> for ColorWriter<'w, W> {
    fn push_annotation(&mut self, ann: &'a Style) -> io::Result<()> {
        self.out.set_color(&ann.to_color_spec())
    }
    fn pop_annotation(&mut self) -> io::Result<()> {
        self.out.reset()
    }
}

impl<'w, W: WriteColor + Write> pretty::Render for ColorWriter<'w, W> {
    type Error = io::Error;
    fn write_str(&mut self, s: &str) -> io::Result<usize> {
        self.out.write_all(s.as_bytes())?;
        Ok(s.len())
    }
    fn write_str_all(&mut self, s: &str) -> io::Result<()> {
        self.out.write_all(s.as_bytes())
    }
    fn fail_doc(&self) -> Self::Error {
        io::Error::other("render failed")
    }
}

/// Retrieve the width of the terminal, or 80 if it cannot be determined.
fn terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

impl Sym {
    /// Build an RcDoc representation of this expression with style annotations.
    pub fn pretty_doc(&self) -> RcDoc<'static, Style> {
        to_doc_with_depth(self, 0)
    }

    /// Render this expression with colors to any termcolor writer at the given width.
    pub fn pretty_render_to<W: WriteColor + Write>(&self, width: usize, out: &mut W) -> io::Result<()> {
        let mut cw = ColorWriter { out };
        self.pretty_doc().render_raw(width, &mut cw)
    }

    /// Print this expression to stdout with colors (TTY-aware), at auto-detected width.
    pub fn pretty_print(&self) -> io::Result<()> {
        let stdout = StandardStream::stdout(ColorChoice::Auto);
        let mut stdout = stdout.lock();
        self.pretty_render_to(terminal_width(), &mut stdout)?;
        writeln!(stdout)
    }

    /// Format this expression into a plain string (no colors).
    pub fn pretty_string(&self, width: usize) -> String {
        let mut buf = String::new();
        let _ = self.pretty_doc().render_fmt(width, &mut buf);
        buf
    }
}

impl std::fmt::Display for Sym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut w = FmtWrite::new(f);
        self.pretty_doc().render_raw(80, &mut w)
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::func::*;

    #[test]
    fn only_needed_parentheses() {
        assert_eq!((var("a") + var("b") + var("c")).to_string(), "a + b + c");
        assert_eq!((var("a") - (var("b") - var("c"))).to_string(), "a - (b - c)");
        assert_eq!(((var("a") + var("b")) * cst(2)).to_string(), "(a + b) * 2.0");
        assert_eq!(
            (var("x") & var("y")).equals(cst(1) << var("n")).to_string(),
            "x & y == 1.0 << n"
        );
    }

    #[test]
    fn atoms_and_calls() {
        assert_eq!(tuple([var("s"), var("c")]).index(1).to_string(), "(s, c)[1]");
        assert_eq!(call("max", [var("a"), cst(0)]).to_string(), "max(a, 0.0)");
        assert_eq!((-var("x")).to_string(), "-x");
        assert_eq!(
            ite(var("c"), var("a"), var("b")).and(boolean(true)).to_string(),
            "(if c then a else b) && true"
        );
    }
}
