use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // End markers
    EndOfInput,
    EndOfFile,

    // Literals and names
    Symbol,
    Unum,
    Inum,
    Fnum,
    Onum,
    QString,

    // Punctuation
    Slash,
    Mul,
    Mod,
    Comma,
    Semicolon,
    Colon,
    OpenSquare,
    CloseSquare,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,
    Dot,
    Assign,
    Lt,
    Gt,
    Sub,
    Add,
    Not,
    Equality,
    Lte,
    Gte,
    Dec,
    Inc,
    Neq,
    And,
    Or,

    // Keywords
    For,
    If,
    Else,
    While,
    Do,
    Switch,
    Case,
    Break,
    Continue,
    Try,
    Except,
    Raise,
    Default,
    Create,
    Destroy,
    Super,
    Entry,
    Class,
    Constructor,
    Destructor,
    Import,
    True,
    False,
    Bool,
    Map,
    Dict,
    List,
    Uint,
    Int,
    Float,
    String,
    Inline,
    Public,
    Private,
    Protected,
    Return,
    As,
    Namespace,
    Nothing,

    // Already reported by the scanner
    Error,
}

impl TokenKind {
    /// Human readable name used in syntax errors.
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            EndOfInput => "END OF INPUT",
            EndOfFile => "END OF FILE",
            Symbol => "symbol",
            Unum => "unsigned number",
            Inum => "signed number",
            Fnum => "float number",
            Onum => "octal number",
            QString => "quoted string",
            Slash => "'/'",
            Mul => "'*'",
            Mod => "'%'",
            Comma => "','",
            Semicolon => "';'",
            Colon => "':'",
            OpenSquare => "'['",
            CloseSquare => "']'",
            OpenCurly => "'{'",
            CloseCurly => "'}'",
            OpenParen => "'('",
            CloseParen => "')'",
            Dot => "'.'",
            Assign => "'='",
            Lt => "'<' or 'lt'",
            Gt => "'>' or 'gt'",
            Sub => "'-'",
            Add => "'+'",
            Not => "'!' or 'not'",
            Equality => "'==' or 'equ'",
            Lte => "'<=' or 'lte'",
            Gte => "'>=' or 'gte'",
            Dec => "'decrement'",
            Inc => "'increment'",
            Neq => "'!=' or 'neq'",
            And => "'&' or 'and'",
            Or => "'|' or 'or'",
            For => "'for'",
            If => "'if'",
            Else => "'else'",
            While => "'while'",
            Do => "'do'",
            Switch => "'switch'",
            Case => "'case'",
            Break => "'break'",
            Continue => "'continue'",
            Try => "'try'",
            Except => "'except'",
            Raise => "'raise'",
            Default => "'default'",
            Create => "'create'",
            Destroy => "'destroy'",
            Super => "'super'",
            Entry => "'entry'",
            Class => "'class'",
            Constructor => "'constructor'",
            Destructor => "'destructor'",
            Import => "'import'",
            True => "'true'",
            False => "'false'",
            Bool => "'bool'",
            Map => "'map'",
            Dict => "'dict'",
            List => "'list'",
            Uint => "'uint'",
            Int => "'int'",
            Float => "'float'",
            String => "'string'",
            Inline => "'inline'",
            Public => "'public'",
            Private => "'private'",
            Protected => "'protected'",
            Return => "'return'",
            As => "'as'",
            Namespace => "'namespace'",
            Nothing => "'nothing'",
            Error => "ERROR",
        }
    }

    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| *kind == self)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Keyword spellings. Must stay sorted by spelling: lookup is a binary search.
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("and", TokenKind::And),
    ("as", TokenKind::As),
    ("bool", TokenKind::Bool),
    ("break", TokenKind::Break),
    ("case", TokenKind::Case),
    ("class", TokenKind::Class),
    ("constructor", TokenKind::Constructor),
    ("continue", TokenKind::Continue),
    ("create", TokenKind::Create),
    ("default", TokenKind::Default),
    ("destroy", TokenKind::Destroy),
    ("destructor", TokenKind::Destructor),
    ("dict", TokenKind::Dict),
    ("do", TokenKind::Do),
    ("else", TokenKind::Else),
    ("entry", TokenKind::Entry),
    ("equ", TokenKind::Equality),
    ("except", TokenKind::Except),
    ("false", TokenKind::False),
    ("float", TokenKind::Float),
    ("for", TokenKind::For),
    ("gt", TokenKind::Gt),
    ("gte", TokenKind::Gte),
    ("if", TokenKind::If),
    ("import", TokenKind::Import),
    ("inline", TokenKind::Inline),
    ("int", TokenKind::Int),
    ("list", TokenKind::List),
    ("lt", TokenKind::Lt),
    ("lte", TokenKind::Lte),
    ("map", TokenKind::Map),
    ("namespace", TokenKind::Namespace),
    ("neq", TokenKind::Neq),
    ("not", TokenKind::Not),
    ("nothing", TokenKind::Nothing),
    ("or", TokenKind::Or),
    ("private", TokenKind::Private),
    ("protected", TokenKind::Protected),
    ("public", TokenKind::Public),
    ("raise", TokenKind::Raise),
    ("return", TokenKind::Return),
    ("string", TokenKind::String),
    ("super", TokenKind::Super),
    ("switch", TokenKind::Switch),
    ("true", TokenKind::True),
    ("try", TokenKind::Try),
    ("uint", TokenKind::Uint),
    ("while", TokenKind::While),
];

/// Look a word up in the keyword table. Non-keywords are symbols.
pub fn keyword_or_symbol(word: &str) -> TokenKind {
    KEYWORDS
        .binary_search_by(|(spelling, _)| (*spelling).cmp(word))
        .map(|idx| KEYWORDS[idx].1)
        .unwrap_or(TokenKind::Symbol)
}

/// One lexical unit. The text is an owned copy of what was matched (for
/// strings, the decoded contents).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: std::string::String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<std::string::String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::QString => write!(f, "\"{}\"", self.text),
            TokenKind::EndOfFile | TokenKind::EndOfInput | TokenKind::Error => {
                write!(f, "{}", self.kind)
            }
            _ => write!(f, "{}", self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table_is_sorted_and_unique() {
        for pair in KEYWORDS.windows(2) {
            assert!(
                pair[0].0 < pair[1].0,
                "'{}' must sort before '{}'",
                pair[0].0,
                pair[1].0
            );
        }
    }

    #[test]
    fn test_every_keyword_is_found() {
        for (spelling, kind) in KEYWORDS {
            assert_eq!(keyword_or_symbol(spelling), *kind, "lookup of '{}'", spelling);
        }
    }

    #[test]
    fn test_non_keywords_are_symbols() {
        for word in ["", "a", "gtx", "nothin", "whiles", "_x", "True", "zzz"] {
            assert_eq!(keyword_or_symbol(word), TokenKind::Symbol, "word '{}'", word);
        }
    }

    #[test]
    fn test_operator_word_aliases() {
        assert_eq!(keyword_or_symbol("equ"), TokenKind::Equality);
        assert_eq!(keyword_or_symbol("neq"), TokenKind::Neq);
        assert_eq!(keyword_or_symbol("lte"), TokenKind::Lte);
        assert_eq!(keyword_or_symbol("gte"), TokenKind::Gte);
        assert_eq!(keyword_or_symbol("not"), TokenKind::Not);
    }

    #[test]
    fn test_describe() {
        assert_eq!(TokenKind::EndOfFile.to_string(), "END OF FILE");
        assert_eq!(TokenKind::CloseParen.to_string(), "')'");
        assert!(TokenKind::While.is_keyword());
        assert!(!TokenKind::Add.is_keyword());
    }
}
