/// All lexemes of the tree notation.
#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    // Keywords
    Closure,
    Free,
    Static,
    True,
    False,
    Null,

    // Symbols
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    LBracket,   // [
    RBracket,   // ]
    Comma,      // ,
    Colon,      // :
    ColonColon, // ::
    Eq,         // =
    Arrow,      // ->
    Lt,         // <
    Gt,         // >

    // Literals
    Integer(i64),
    Float(f64),
    Str(String),
    /// Identifiers, including form heads such as `lambda` or `invoke!`.
    Ident(String),

    // End of file
    Eof,
}

impl Lexeme {
    /// Try to match an identifier string to a keyword lexeme.
    pub fn from_keyword(s: &str) -> Option<Lexeme> {
        match s {
            "closure" => Some(Lexeme::Closure),
            "free" => Some(Lexeme::Free),
            "static" => Some(Lexeme::Static),
            "true" => Some(Lexeme::True),
            "false" => Some(Lexeme::False),
            "null" => Some(Lexeme::Null),
            _ => None,
        }
    }

    /// Human-readable description for error messages.
    pub fn description(&self) -> String {
        match self {
            Lexeme::Closure => "'closure'".to_string(),
            Lexeme::Free => "'free'".to_string(),
            Lexeme::Static => "'static'".to_string(),
            Lexeme::True => "'true'".to_string(),
            Lexeme::False => "'false'".to_string(),
            Lexeme::Null => "'null'".to_string(),
            Lexeme::LParen => "'('".to_string(),
            Lexeme::RParen => "')'".to_string(),
            Lexeme::LBrace => "'{'".to_string(),
            Lexeme::RBrace => "'}'".to_string(),
            Lexeme::LBracket => "'['".to_string(),
            Lexeme::RBracket => "']'".to_string(),
            Lexeme::Comma => "','".to_string(),
            Lexeme::Colon => "':'".to_string(),
            Lexeme::ColonColon => "'::'".to_string(),
            Lexeme::Eq => "'='".to_string(),
            Lexeme::Arrow => "'->'".to_string(),
            Lexeme::Lt => "'<'".to_string(),
            Lexeme::Gt => "'>'".to_string(),
            Lexeme::Integer(n) => format!("integer {}", n),
            Lexeme::Float(x) => format!("float {:?}", x),
            Lexeme::Str(_) => "string literal".to_string(),
            Lexeme::Ident(s) => format!("identifier '{}'", s),
            Lexeme::Eof => "end of file".to_string(),
        }
    }
}
