//! Constant expression evaluation for `#if` conditions.
//!
//! Conditions are evaluated after macro expansion, so by the time this
//! module sees them they contain only integer literals, `true`/`false`,
//! parentheses and operators. Any other input is a malformed condition and
//! yields `None`; the directive processor turns that into a structured
//! error at the `#if` line.

#[derive(Clone, Debug, PartialEq, Eq)]
enum CondToken {
    Number(i64),
    True,
    False,
    LParen,
    RParen,
    Not,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

/// Evaluate a condition expression to an integer constant.
///
/// Returns `None` for anything malformed: unknown identifiers, stray
/// operators, unbalanced parentheses, division by zero, overflow.
pub(crate) fn evaluate(expr: &str) -> Option<i64> {
    let tokens = tokenize(expr)?;
    let mut pos = 0;
    let value = parse_or(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return None;
    }
    Some(value)
}

fn tokenize(expr: &str) -> Option<Vec<CondToken>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '0'..='9' => {
                let mut num = String::new();
                num.push(ch);
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        num.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(CondToken::Number(num.parse().ok()?));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = String::new();
                ident.push(ch);
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match ident.as_str() {
                    "true" => tokens.push(CondToken::True),
                    "false" => tokens.push(CondToken::False),
                    // An identifier surviving expansion is not a constant.
                    _ => return None,
                }
            }
            '(' => tokens.push(CondToken::LParen),
            ')' => tokens.push(CondToken::RParen),
            '!' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(CondToken::NotEqual);
                } else {
                    tokens.push(CondToken::Not);
                }
            }
            '=' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(CondToken::Equal);
                } else {
                    return None;
                }
            }
            '<' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(CondToken::LessEqual);
                } else {
                    tokens.push(CondToken::Less);
                }
            }
            '>' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(CondToken::GreaterEqual);
                } else {
                    tokens.push(CondToken::Greater);
                }
            }
            '&' => {
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(CondToken::And);
                } else {
                    return None;
                }
            }
            '|' => {
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push(CondToken::Or);
                } else {
                    return None;
                }
            }
            '+' => tokens.push(CondToken::Plus),
            '-' => tokens.push(CondToken::Minus),
            '*' => tokens.push(CondToken::Multiply),
            '/' => tokens.push(CondToken::Divide),
            '%' => tokens.push(CondToken::Modulo),
            c if c.is_whitespace() => {}
            _ => return None,
        }
    }
    Some(tokens)
}

fn parse_or(tokens: &[CondToken], pos: &mut usize) -> Option<i64> {
    let mut left = parse_and(tokens, pos)?;
    while tokens.get(*pos) == Some(&CondToken::Or) {
        *pos += 1;
        let right = parse_and(tokens, pos)?;
        left = i64::from(left != 0 || right != 0);
    }
    Some(left)
}

fn parse_and(tokens: &[CondToken], pos: &mut usize) -> Option<i64> {
    let mut left = parse_comparison(tokens, pos)?;
    while tokens.get(*pos) == Some(&CondToken::And) {
        *pos += 1;
        let right = parse_comparison(tokens, pos)?;
        left = i64::from(left != 0 && right != 0);
    }
    Some(left)
}

fn parse_comparison(tokens: &[CondToken], pos: &mut usize) -> Option<i64> {
    let left = parse_additive(tokens, pos)?;
    let op = match tokens.get(*pos) {
        Some(
            op @ (CondToken::Equal
            | CondToken::NotEqual
            | CondToken::Less
            | CondToken::LessEqual
            | CondToken::Greater
            | CondToken::GreaterEqual),
        ) => op.clone(),
        _ => return Some(left),
    };
    *pos += 1;
    let right = parse_additive(tokens, pos)?;
    let result = match op {
        CondToken::Equal => left == right,
        CondToken::NotEqual => left != right,
        CondToken::Less => left < right,
        CondToken::LessEqual => left <= right,
        CondToken::Greater => left > right,
        _ => left >= right,
    };
    Some(i64::from(result))
}

fn parse_additive(tokens: &[CondToken], pos: &mut usize) -> Option<i64> {
    let mut left = parse_multiplicative(tokens, pos)?;
    loop {
        match tokens.get(*pos) {
            Some(CondToken::Plus) => {
                *pos += 1;
                left = left.checked_add(parse_multiplicative(tokens, pos)?)?;
            }
            Some(CondToken::Minus) => {
                *pos += 1;
                left = left.checked_sub(parse_multiplicative(tokens, pos)?)?;
            }
            _ => return Some(left),
        }
    }
}

fn parse_multiplicative(tokens: &[CondToken], pos: &mut usize) -> Option<i64> {
    let mut left = parse_unary(tokens, pos)?;
    loop {
        match tokens.get(*pos) {
            Some(CondToken::Multiply) => {
                *pos += 1;
                left = left.checked_mul(parse_unary(tokens, pos)?)?;
            }
            Some(CondToken::Divide) => {
                *pos += 1;
                left = left.checked_div(parse_unary(tokens, pos)?)?;
            }
            Some(CondToken::Modulo) => {
                *pos += 1;
                left = left.checked_rem(parse_unary(tokens, pos)?)?;
            }
            _ => return Some(left),
        }
    }
}

fn parse_unary(tokens: &[CondToken], pos: &mut usize) -> Option<i64> {
    match tokens.get(*pos) {
        Some(CondToken::Not) => {
            *pos += 1;
            let value = parse_unary(tokens, pos)?;
            Some(i64::from(value == 0))
        }
        Some(CondToken::Minus) => {
            *pos += 1;
            let value = parse_unary(tokens, pos)?;
            value.checked_neg()
        }
        _ => parse_primary(tokens, pos),
    }
}

fn parse_primary(tokens: &[CondToken], pos: &mut usize) -> Option<i64> {
    match tokens.get(*pos)? {
        CondToken::Number(value) => {
            *pos += 1;
            Some(*value)
        }
        CondToken::True => {
            *pos += 1;
            Some(1)
        }
        CondToken::False => {
            *pos += 1;
            Some(0)
        }
        CondToken::LParen => {
            *pos += 1;
            let value = parse_or(tokens, pos)?;
            if tokens.get(*pos) != Some(&CondToken::RParen) {
                return None;
            }
            *pos += 1;
            Some(value)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans() {
        assert_eq!(evaluate("true"), Some(1));
        assert_eq!(evaluate("false"), Some(0));
        assert_eq!(evaluate("!false"), Some(1));
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(evaluate("1 + 2 * 3 == 7"), Some(1));
        assert_eq!(evaluate("(1 + 2) * 3 == 9"), Some(1));
        assert_eq!(evaluate("-(-5) == 5"), Some(1));
    }

    #[test]
    fn logical_operators() {
        assert_eq!(evaluate("(1 && 0) || (1 && 1)"), Some(1));
        assert_eq!(evaluate("true && false"), Some(0));
    }

    #[test]
    fn comparisons() {
        assert_eq!(evaluate("5 > 3 && 10 >= 10 && 2 < 4 && 5 <= 5"), Some(1));
        assert_eq!(evaluate("3 != 4 && 5 == 5"), Some(1));
    }

    #[test]
    fn malformed_expressions() {
        assert_eq!(evaluate(""), None);
        assert_eq!(evaluate("UNKNOWN_MACRO"), None);
        assert_eq!(evaluate("1 +"), None);
        assert_eq!(evaluate("(1"), None);
        assert_eq!(evaluate("1 / 0"), None);
        assert_eq!(evaluate("1 = 1"), None);
    }
}
