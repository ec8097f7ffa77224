//! Decorative quotes shown on the index page and attached to lookups.

pub const QUOTES: [&str; 20] = [
    "Aristotle: To actualize its potential.",
    "Plato: For the greater good.",
    "Socrates: To examine the other side.",
    "Descartes: It had sufficient reason to believe it was dreaming.",
    "Hume: Out of habit.",
    "Kant: Out of a sense of duty.",
    "Nietzsche: Because if you gaze too long across the road, the road gazes also across you.",
    "Hegel: To fulfill the dialectical progression.",
    "Marx: It was a historical inevitability.",
    "Sartre: In order to act in good faith and be true to itself.",
    "Camus: One must imagine Sisyphus happy and the chicken crossing the road.",
    "Wittgenstein: The meaning of 'cross' was in the use, not in the action.",
    "Derrida: The chicken was making a deconstructive statement on the binary opposition of 'this side' and 'that side.'",
    "Heidegger: To authentically dwell in the world.",
    "Foucault: Because of the societal structures and power dynamics at play.",
    "Chomsky: For a syntactic, not pragmatic, purpose.",
    "Buddha: If you meet the chicken on the road, kill it.",
    "Laozi: The chicken follows its path naturally.",
    "Confucius: The chicken crossed the road to reach the state of Ren.",
    "Leibniz: In the best of all possible worlds, the chicken would cross the road.",
];

pub trait QuoteSource: Send + Sync {
    fn pick(&self) -> &'static str;
}

/// Uniformly random choice from [`QUOTES`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomQuotes;

impl QuoteSource for RandomQuotes {
    fn pick(&self) -> &'static str {
        QUOTES[fastrand::usize(..QUOTES.len())]
    }
}

/// Always returns the quote at one index; wraps around past the end.
#[derive(Debug, Clone, Copy)]
pub struct FixedQuote(pub usize);

impl QuoteSource for FixedQuote {
    fn pick(&self) -> &'static str {
        QUOTES[self.0 % QUOTES.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_quote_comes_from_the_pool() {
        for _ in 0..50 {
            assert!(QUOTES.contains(&RandomQuotes.pick()));
        }
    }

    #[test]
    fn fixed_quote_wraps() {
        assert_eq!(FixedQuote(0).pick(), QUOTES[0]);
        assert_eq!(FixedQuote(QUOTES.len() + 2).pick(), QUOTES[2]);
    }
}
