use tantivy::tokenizer::{
	LowerCaser, RemoveLongFilter, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream,
};

pub const STOP_WORDS: &[&str] = &[
	"a","about","after","again","all","also","am","an","and","any","are","as","at","be","because","been","before","being","both","but","by",
	"can","could","did","do","does","doing","down","during","each","few","for","from","further","had","has","have","having","he","her","here",
	"hers","him","his","how","i","if","in","into","is","it","its","just","may","me","might","more","most","must","my","no","nor","not","of",
	"off","on","once","only","or","other","our","ours","out","over","own","same","shall","she","should","so","some","such","than","that","the",
	"their","them","then","there","these","they","this","those","through","to","too","under","until","up","very","was","we","were","what","when",
	"where","which","while","who","whom","whose","why","will","with","would","you","your","yours",
];

const MAX_TOKEN_LEN: usize = 40;

/// Tokenizer chain shared by corpus fitting and query projection, so both
/// sides of the sparse path see identical terms.
#[derive(Clone)]
pub struct Analyzer {
	inner: TextAnalyzer,
}

impl Default for Analyzer {
	fn default() -> Self {
		let inner = TextAnalyzer::builder(SimpleTokenizer::default())
			.filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
			.filter(LowerCaser)
			.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
			.build();
		Self { inner }
	}
}

impl Analyzer {
	/// Lowercased, stop-word-free tokens that start with a letter and are at
	/// least two characters long.
	pub fn tokens(&self, text: &str) -> Vec<String> {
		let mut analyzer = self.inner.clone();
		let mut stream = analyzer.token_stream(text);
		let mut out = Vec::new();
		while stream.advance() {
			let token = &stream.token().text;
			if is_term(token) { out.push(token.clone()); }
		}
		out
	}
}

fn is_term(token: &str) -> bool {
	let mut chars = token.chars();
	matches!(chars.next(), Some(c) if c.is_alphabetic()) && chars.next().is_some()
}
