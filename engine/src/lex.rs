use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Error)]
/// LexErrorKind occurs when there is an invalid or unexpected token.
pub enum LexErrorKind {
    /// Expected the next token to be of a named class
    #[error("expected {0}")]
    ExpectedName(&'static str),

    /// Expected the next token to be a Literal
    #[error("expected literal {0:?}")]
    ExpectedLiteral(&'static str),

    /// Expected the next token to be an ending quote
    #[error("could not find an ending quote")]
    MissingEndingQuote,

    /// None of the token rules matched the input
    #[error("unrecognised token")]
    UnrecognisedToken,

    /// End Of File
    #[error("unrecognised input")]
    EOF,
}

pub type LexError<'i> = (LexErrorKind, &'i str);

pub type LexResult<'i, T> = Result<(T, &'i str), LexError<'i>>;

pub trait Lex<'i>: Sized {
    fn lex(input: &'i str) -> LexResult<'i, Self>;
}

pub fn expect<'i>(input: &'i str, s: &'static str) -> Result<&'i str, LexError<'i>> {
    if let Some(index) = input.strip_prefix(s) {
        Ok(index)
    } else {
        Err((LexErrorKind::ExpectedLiteral(s), input))
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Like [`expect`], but the literal must not continue into a longer word.
pub fn expect_word<'i>(input: &'i str, s: &'static str) -> Result<&'i str, LexError<'i>> {
    let rest = expect(input, s)?;
    if rest.starts_with(is_word_char) {
        Err((LexErrorKind::ExpectedLiteral(s), input))
    } else {
        Ok(rest)
    }
}

const SPACE_CHARS: &[char] = &[' ', '\t', '\r', '\n'];

pub fn skip_space(input: &str) -> &str {
    input.trim_start_matches(SPACE_CHARS)
}

/// This macro generates a keyword enum declaration + lexer implementation.
///
/// It works by recursively processing variants one by one, while passing
/// around intermediate state (partial declaration, lexer body and the
/// keyword lookup used when printing).
///
/// Every variant lists one or more keywords; the first one is the canonical
/// spelling returned by `as_str`.
macro_rules! lex_enum {
    // Branch for handling `"some_string" | "other_string" => VariantName`.
    //
    // On the lexer side, tries each of the given keywords as a whole word,
    // and returns the variant if any of them succeeded.
    (@decl $preamble:tt $name:ident $input:ident { $($decl:tt)* } { $($expr:tt)* } { $($arms:tt)* } {
        $(#[$meta:meta])* $first:literal $(| $s:literal)* => $item:ident,
        $($rest:tt)*
    }) => {
        lex_enum!(@decl $preamble $name $input {
            $($decl)*
            $(#[$meta])*
            $item,
        } {
            $($expr)*
            if let Ok($input) = $crate::lex::expect_word($input, $first) {
                return Ok(($name::$item, $input));
            }
            $(if let Ok($input) = $crate::lex::expect_word($input, $s) {
                return Ok(($name::$item, $input));
            })*
        } {
            $($arms)*
            $name::$item => $first,
        } { $($rest)* });
    };

    // Internal finish point for declaration + lexer generation.
    (@decl { $($preamble:tt)* } $name:ident $input:ident $decl:tt { $($expr:stmt)* } { $($arms:tt)* } {}) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
        $($preamble)*
        pub enum $name $decl

        impl $name {
            /// Canonical keyword of this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($arms)*
                }
            }
        }

        impl<'i> $crate::lex::Lex<'i> for $name {
            fn lex($input: &'i str) -> $crate::lex::LexResult<'i, Self> {
                $($expr)*
                Err((
                    $crate::lex::LexErrorKind::ExpectedName(stringify!($name)),
                    $input
                ))
            }
        }
    };

    // The public entry point to the macro.
    ($(#[$meta:meta])* $name:ident $items:tt) => {
        lex_enum!(@decl {
            $(#[$meta])*
        } $name input {} {} {} $items);
    };
}

pub fn span<'i>(input: &'i str, rest: &'i str) -> &'i str {
    &input[..input.len() - rest.len()]
}

pub fn take_while<'i, F: Fn(char) -> bool>(
    input: &'i str,
    name: &'static str,
    f: F,
) -> LexResult<'i, &'i str> {
    let mut iter = input.chars();
    loop {
        let rest = iter.as_str();
        match iter.next() {
            Some(c) if f(c) => {}
            _ => {
                return if rest.len() != input.len() {
                    Ok((span(input, rest), rest))
                } else {
                    Err((LexErrorKind::ExpectedName(name), input))
                };
            }
        }
    }
}

pub fn complete<T>(res: LexResult<'_, T>) -> Result<T, LexError<'_>> {
    let (res, input) = res?;
    if input.is_empty() {
        Ok(res)
    } else {
        Err((LexErrorKind::EOF, input))
    }
}

#[cfg(test)]
macro_rules! assert_ok {
    ($s:expr, $res:expr, $rest:expr) => {{
        let expr = $s.unwrap();
        assert_eq!(expr, ($res, $rest));
        expr.0
    }};

    ($s:expr, $res:expr) => {
        assert_ok!($s, $res, "")
    };
}

#[cfg(test)]
macro_rules! assert_err {
    ($s:expr, $kind:expr, $span:expr) => {
        assert_eq!($s, Err(($kind, $span)))
    };
}

#[cfg(test)]
macro_rules! assert_json {
    ($expr:expr, $json:tt) => {{
        let json = ::serde_json::to_value(&$expr).unwrap();
        assert_eq!(json, ::serde_json::json!($json));
        json
    }};
}
