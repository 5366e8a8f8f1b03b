//! Quine-McCluskey minimisation, extended with XOR/XNOR merges
//!
//! Produces a minimal-ish set of implicants over the alphabet
//! `{0, 1, -, ^, ~}` that covers exactly the given `ones` (and may freely
//! assign `dontcares` either way). Used by [`crate::bitwise`] to turn a CRC
//! table into a closed-form boolean expression.

use std::collections::{HashMap, HashSet};

/// One implicant: a string of `0`/`1`/`-`/`^`/`~`, MSB first
pub type Term = String;

fn popcount(t: &str, c: char) -> usize {
    t.chars().filter(|&ch| ch == c).count()
}

/// Try to combine two terms of the same `1`-count into an XOR term: the
/// two terms must differ in exactly two positions, one going `0->1` and
/// the other `1->0`, and neither may already carry `^`/`~`.
fn reduce_simple_xor(t1: &str, t2: &str) -> Option<Term> {
    let mut diff10 = 0;
    let mut diff20 = 0;
    let mut out = String::with_capacity(t1.len());
    for (c1, c2) in t1.chars().zip(t2.chars()) {
        if c1 == '^' || c2 == '^' || c1 == '~' || c2 == '~' {
            return None;
        } else if c1 != c2 {
            out.push('^');
            if c2 == '0' {
                diff10 += 1;
            } else {
                diff20 += 1;
            }
        } else {
            out.push(c1);
        }
    }
    if diff10 == 1 && diff20 == 1 {
        Some(out)
    } else {
        None
    }
}

/// Same as [`reduce_simple_xor`] but for XNOR: both differing positions
/// must flip the same direction.
fn reduce_simple_xnor(t1: &str, t2: &str) -> Option<Term> {
    let mut diff10 = 0;
    let mut diff20 = 0;
    let mut out = String::with_capacity(t1.len());
    for (c1, c2) in t1.chars().zip(t2.chars()) {
        if c1 == '^' || c2 == '^' || c1 == '~' || c2 == '~' {
            return None;
        } else if c1 != c2 {
            out.push('~');
            if c1 == '0' {
                diff10 += 1;
            } else {
                diff20 += 1;
            }
        } else {
            out.push(c1);
        }
    }
    if (diff10 == 2 && diff20 == 0) || (diff10 == 0 && diff20 == 2) {
        Some(out)
    } else {
        None
    }
}

fn key(t: &str) -> (usize, usize, usize) {
    let n_ones = popcount(t, '1');
    let n_xor = popcount(t, '^');
    let n_xnor = popcount(t, '~');
    debug_assert!(n_xor == 0 || n_xnor == 0, "a term may not mix ^ and ~");
    (n_ones, n_xor, n_xnor)
}

fn get_prime_implicants(n_bits: usize, seed: HashSet<Term>) -> HashSet<Term> {
    let mut terms = seed;

    // seed with simple XOR/XNOR pairs, grouped by popcount('1')
    let mut by_ones: HashMap<usize, Vec<Term>> = HashMap::new();
    for t in &terms {
        by_ones.entry(popcount(t, '1')).or_default().push(t.clone());
    }
    let mut new_terms = HashSet::new();
    for gi in 0..=n_bits {
        let group = match by_ones.get(&gi) {
            Some(g) => g,
            None => continue,
        };
        for t1 in group {
            for t2 in group {
                if let Some(t12) = reduce_simple_xor(t1, t2) {
                    new_terms.insert(t12);
                }
            }
            if let Some(group2) = by_ones.get(&(gi + 2)) {
                for t2 in group2 {
                    if let Some(t12) = reduce_simple_xnor(t1, t2) {
                        new_terms.insert(t12);
                    }
                }
            }
        }
    }
    terms.extend(new_terms);

    let mut marked: HashSet<Term> = HashSet::new();

    loop {
        let mut groups: HashMap<(usize, usize, usize), HashSet<Term>> = HashMap::new();
        for t in &terms {
            groups.entry(key(t)).or_default().insert(t.clone());
        }

        let mut next_terms: HashSet<Term> = HashSet::new();
        let mut used: HashSet<Term> = HashSet::new();

        // standard Quine combination: (n,x,y) with (n+1,x,y), flip a 0 to 1
        let keys: Vec<_> = groups.keys().cloned().collect();
        for k in &keys {
            let (n, x, y) = *k;
            let next_key = (n + 1, x, y);
            let group_next = match groups.get(&next_key) {
                Some(g) => g.clone(),
                None => continue,
            };
            let group = groups[k].clone();
            for t1 in &group {
                for (i, c1) in t1.char_indices() {
                    if c1 == '0' {
                        let mut t2 = t1.clone();
                        t2.replace_range(i..i + 1, "1");
                        if group_next.contains(&t2) {
                            let mut t12 = t1.clone();
                            t12.replace_range(i..i + 1, "-");
                            used.insert(t1.clone());
                            used.insert(t2.clone());
                            next_terms.insert(t12);
                        }
                    }
                }
            }
        }

        // XOR combination: (n,x,y) with (n+1,y,x), x > 0
        for k in &keys {
            let (n, x, y) = *k;
            if x == 0 {
                continue;
            }
            let complement_key = (n + 1, y, x);
            let group_complement = match groups.get(&complement_key) {
                Some(g) => g.clone(),
                None => continue,
            };
            let group = groups[k].clone();
            for t1 in &group {
                let t1_complement: String = t1.chars().map(|c| if c == '^' { '~' } else { c }).collect();
                for (i, c1) in t1.char_indices() {
                    if c1 == '0' {
                        let mut t2 = t1_complement.clone();
                        t2.replace_range(i..i + 1, "1");
                        if group_complement.contains(&t2) {
                            let mut t12 = t1.clone();
                            t12.replace_range(i..i + 1, "^");
                            used.insert(t1.clone());
                            next_terms.insert(t12);
                        }
                    }
                }
            }
        }

        // XNOR combination: (n,x,y) with (n+1,y,x), y > 0
        for k in &keys {
            let (n, x, y) = *k;
            if y == 0 {
                continue;
            }
            let complement_key = (n + 1, y, x);
            let group_complement = match groups.get(&complement_key) {
                Some(g) => g.clone(),
                None => continue,
            };
            let group = groups[k].clone();
            for t1 in &group {
                let t1_complement: String = t1.chars().map(|c| if c == '~' { '^' } else { c }).collect();
                for (i, c1) in t1.char_indices() {
                    if c1 == '0' {
                        let mut t2 = t1_complement.clone();
                        t2.replace_range(i..i + 1, "1");
                        if group_complement.contains(&t2) {
                            let mut t12 = t1.clone();
                            t12.replace_range(i..i + 1, "~");
                            used.insert(t1.clone());
                            next_terms.insert(t12);
                        }
                    }
                }
            }
        }

        for g in groups.values() {
            for t in g {
                if !used.contains(t) {
                    marked.insert(t.clone());
                }
            }
        }

        if used.is_empty() {
            break;
        }
        terms = next_terms;
    }

    marked
}

fn term_rank(term: &str, n_covers: usize) -> usize {
    let mut n = 0;
    for c in term.chars() {
        n += match c {
            '-' => 8,
            '^' => 4,
            '~' => 2,
            '1' => 1,
            _ => 0,
        };
    }
    4 * n_covers + n
}

fn get_essential_implicants(terms: HashSet<Term>) -> HashSet<Term> {
    let perms: HashMap<Term, HashSet<String>> = terms
        .iter()
        .map(|t| (t.clone(), permutations(t).collect()))
        .collect();

    let mut groups: HashMap<usize, Vec<Term>> = HashMap::new();
    for t in &terms {
        let n = term_rank(t, perms[t].len());
        groups.entry(n).or_default().push(t.clone());
    }

    let mut ranks: Vec<usize> = groups.keys().cloned().collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let mut covered: HashSet<String> = HashSet::new();
    let mut essential: HashSet<Term> = HashSet::new();
    for rank in ranks {
        for t in &groups[&rank] {
            let p = &perms[t];
            if !p.is_subset(&covered) {
                essential.insert(t.clone());
                covered.extend(p.iter().cloned());
            }
        }
    }
    essential
}

/// Simplifies a set of `ones`/`dontcares` integer assignments, `n_bits` wide
pub fn simplify(n_bits: usize, ones: &[u128], dontcares: &[u128]) -> HashSet<Term> {
    let to_str = |v: u128| -> Term {
        (0..n_bits)
            .rev()
            .map(|k| if v & (1 << k) != 0 { '1' } else { '0' })
            .collect()
    };
    let ones_s: HashSet<Term> = ones.iter().map(|&v| to_str(v)).collect();
    let dc_s: HashSet<Term> = dontcares.iter().map(|&v| to_str(v)).collect();
    simplify_los(ones_s, dc_s)
}

/// Same as [`simplify`] but takes pre-encoded `0`/`1` strings
pub fn simplify_los(ones: HashSet<Term>, dontcares: HashSet<Term>) -> HashSet<Term> {
    let mut terms = ones;
    terms.extend(dontcares);
    if terms.is_empty() {
        return HashSet::new();
    }
    let n_bits = terms.iter().next().unwrap().len();
    debug_assert!(terms.iter().all(|t| t.len() == n_bits));

    let primes = get_prime_implicants(n_bits, terms);
    get_essential_implicants(primes)
}

/// Expands a `{0,1,-,^,~}` term into every concrete `0`/`1` assignment it
/// denotes, honouring XOR/XNOR parity.
///
/// A forward/backward sweep over character positions: walks forward
/// assigning bits, and on reaching the end yields the current assignment,
/// then walks backward flipping the last free bit (a `-`, `^`, or `~`) it
/// finds, toggling direction each time it turns around.
pub fn permutations(value: &str) -> impl Iterator<Item = String> + '_ {
    PermutationIter::new(value)
}

struct PermutationIter<'a> {
    value: &'a [u8],
    res: Vec<u8>,
    n_xor: i32,
    xor_value: i32,
    seen_xors: i32,
    i: isize,
    direction: isize,
    done: bool,
}

impl<'a> PermutationIter<'a> {
    fn new(value: &'a str) -> Self {
        let value = value.as_bytes();
        let n_bits = value.len();
        let n_xor = value.iter().filter(|&&c| c == b'^' || c == b'~').count() as i32;
        PermutationIter {
            value,
            res: vec![b'0'; n_bits],
            n_xor,
            xor_value: 0,
            seen_xors: 0,
            i: 0,
            direction: 1,
            done: n_bits == 0,
        }
    }
}

impl<'a> Iterator for PermutationIter<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        let n_bits = self.value.len() as isize;
        while self.i >= 0 {
            let c = self.value[self.i as usize];
            match c {
                b'0' | b'1' => {
                    self.res[self.i as usize] = c;
                }
                b'-' => {
                    let i = self.i as usize;
                    if self.direction == 1 {
                        self.res[i] = b'0';
                    } else if self.res[i] == b'0' {
                        self.res[i] = b'1';
                        self.direction = 1;
                    }
                }
                b'^' | b'~' => {
                    let i = self.i as usize;
                    self.seen_xors += self.direction as i32;
                    let target = if c == b'^' { 0 } else { 1 };
                    if self.direction == 1 {
                        if self.seen_xors == self.n_xor && self.xor_value == target {
                            self.res[i] = b'1';
                        } else {
                            self.res[i] = b'0';
                        }
                    } else if self.res[i] == b'0' && self.seen_xors < self.n_xor - 1 {
                        self.res[i] = b'1';
                        self.direction = 1;
                        self.seen_xors += 1;
                    }
                    if self.res[i] == b'1' {
                        self.xor_value ^= 1;
                    }
                }
                _ => unreachable!("invalid term character"),
            }

            self.i += self.direction;
            if self.i == n_bits {
                self.direction = -1;
                self.i = n_bits - 1;
                let out = String::from_utf8(self.res.clone()).unwrap();
                if self.i < 0 {
                    self.done = true;
                }
                return Some(out);
            }
        }
        self.done = true;
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simple_and() {
        // x = b1 & !b0
        let ones = [0b0010u128, 0b0110, 0b1010, 0b1110];
        let terms = simplify(4, &ones, &[]);
        assert_eq!(terms, HashSet::from(["--10".to_string()]));
    }

    #[test]
    fn simple_xor() {
        // x = b1 ^ b0
        let ones = [0b0001u128, 0b0010, 0b0101, 0b0110, 0b1001, 0b1010, 0b1101, 0b1110];
        let terms = simplify(4, &ones, &[]);
        assert_eq!(terms, HashSet::from(["--^^".to_string()]));
    }

    #[test]
    fn permutation_completeness() {
        for term in ["--10", "--^^", "1-0-", "~~01"] {
            let n_bits = term.len();
            let dashes = term.chars().filter(|&c| c == '-').count();
            let xors = term.chars().filter(|&c| c == '^').count();
            let xnors = term.chars().filter(|&c| c == '~').count();
            // a k-wide xor/xnor group fixes one of its bits by parity, so it
            // contributes 2^(k-1) assignments, not 2^k; plain dashes are
            // fully free and contribute 2^dashes
            let group = xors + xnors;
            let expected = (1usize << dashes) * if group > 0 { 1 << (group - 1) } else { 1 };

            let mut seen = HashSet::new();
            for p in permutations(term) {
                assert_eq!(p.len(), n_bits);
                for (c, bit) in term.chars().zip(p.chars()) {
                    match c {
                        '0' => assert_eq!(bit, '0'),
                        '1' => assert_eq!(bit, '1'),
                        _ => {}
                    }
                }
                assert!(seen.insert(p));
            }
            if xors > 0 {
                for p in &seen {
                    let xor_parity = term
                        .chars()
                        .zip(p.chars())
                        .filter(|&(c, _)| c == '^')
                        .fold(false, |acc, (_, b)| acc ^ (b == '1'));
                    assert!(xor_parity, "^-group must have odd parity");
                }
            }
            if xnors > 0 {
                for p in &seen {
                    let xnor_parity = term
                        .chars()
                        .zip(p.chars())
                        .filter(|&(c, _)| c == '~')
                        .fold(false, |acc, (_, b)| acc ^ (b == '1'));
                    assert!(!xnor_parity, "~-group must have even parity");
                }
            }
            assert_eq!(seen.len(), expected);
        }
    }

    #[test]
    fn covers_all_ones() {
        let ones: Vec<u128> = vec![1, 2, 6, 8, 15];
        let terms = simplify(4, &ones, &[]);
        let mut covered: HashSet<u128> = HashSet::new();
        for t in &terms {
            for p in permutations(t) {
                covered.insert(u128::from_str_radix(&p, 2).unwrap());
            }
        }
        for &o in &ones {
            assert!(covered.contains(&o));
        }
    }
}
