// Formula parser - tokenizer plus recursive descent over the arithmetic
// grammar: numbers, cell refs (A1), + - * /, unary sign, parentheses.

use crate::position::Position;

/// Expression tree for one formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Cell reference. May be out of grid bounds; such references evaluate
    /// to a ref error and are excluded from the reference list.
    Ref(Position),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn symbol(&self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
        }
    }
}

/// Parse an expression (text after the formula marker) into a tree.
pub fn parse(input: &str) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("empty formula".to_string());
    }
    let (expr, pos) = parse_add_sub(&tokens, 0)?;
    if pos != tokens.len() {
        return Err(format!("unexpected {} after expression", tokens[pos].describe()));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    CellRef(Position),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::CellRef(pos) => format!("reference {}", pos),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            'A'..='Z' => {
                // Cell reference: uppercase letters then a row number
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match Position::from_a1(&ident) {
                    Some(pos) => tokens.push(Token::CellRef(pos)),
                    None => return Err(format!("invalid cell reference: {}", ident)),
                }
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let num: f64 = num_str
                    .parse()
                    .map_err(|_| format!("invalid number: {}", num_str))?;
                // f64 parsing saturates to infinity, which has no
                // re-parseable rendering
                if !num.is_finite() {
                    return Err(format!("number out of range: {}", num_str));
                }
                tokens.push(Token::Number(num));
            }
            _ => return Err(format!("unexpected character: {}", c)),
        }
    }

    Ok(tokens)
}

fn parse_add_sub(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_unary(tokens, pos)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => BinOp::Mul,
            Token::Slash => BinOp::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1)?;
        left = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

// Unary sign binds tighter than any binary operator and nests (--1 is
// minus(minus(1))).
fn parse_unary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    if pos >= tokens.len() {
        return Err("unexpected end of formula".to_string());
    }
    let op = match &tokens[pos] {
        Token::Plus => UnaryOp::Plus,
        Token::Minus => UnaryOp::Minus,
        _ => return parse_primary(tokens, pos),
    };
    let (expr, new_pos) = parse_unary(tokens, pos + 1)?;
    Ok((
        Expr::Unary {
            op,
            expr: Box::new(expr),
        },
        new_pos,
    ))
}

fn parse_primary(tokens: &[Token], pos: usize) -> Result<(Expr, usize), String> {
    if pos >= tokens.len() {
        return Err("unexpected end of formula".to_string());
    }

    match &tokens[pos] {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::CellRef(p) => Ok((Expr::Ref(*p), pos + 1)),
        Token::LParen => {
            let (expr, new_pos) = parse_add_sub(tokens, pos + 1)?;
            if new_pos >= tokens.len() || tokens[new_pos] != Token::RParen {
                return Err("missing closing parenthesis".to_string());
            }
            Ok((expr, new_pos + 1))
        }
        other => Err(format!("unexpected {}", other.describe())),
    }
}

impl Expr {
    // Atoms 4, unary sign 3, * / 2, + - 1.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::Ref(_) => 4,
            Expr::Unary { .. } => 3,
            Expr::Binary { op, .. } => match op {
                BinOp::Add | BinOp::Sub => 1,
                BinOp::Mul | BinOp::Div => 2,
            },
        }
    }
}

/// Canonical rendering: no whitespace, parentheses exactly where the tree
/// shape requires them. Re-parsing the rendering gives back the same text.
impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Ref(pos) => write!(f, "{}", pos),
            Expr::Unary { op, expr } => {
                let symbol = match op {
                    UnaryOp::Plus => '+',
                    UnaryOp::Minus => '-',
                };
                if expr.precedence() < self.precedence() {
                    write!(f, "{}({})", symbol, expr)
                } else {
                    write!(f, "{}{}", symbol, expr)
                }
            }
            Expr::Binary { op, left, right } => {
                let prec = self.precedence();
                if left.precedence() < prec {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, "{}", op.symbol())?;
                // Right operand of - and / needs parens at equal precedence:
                // a-(b-c) is not a-b-c.
                let grouped = matches!(op, BinOp::Sub | BinOp::Div);
                if right.precedence() < prec || (grouped && right.precedence() == prec) {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
        }
    }
}
