//! Constructions over DFAs: subset construction, partition-refinement
//! minimization, products, complement and completion.

use super::Dfa;
use crate::fsm::Nfa;
use crate::state::StateId;
use std::collections::{BTreeSet, HashMap, VecDeque};

impl Dfa {
    /// Subset construction. The DFA start is the epsilon closure of the
    /// NFA start; each discovered subset is expanded over the NFA's
    /// alphabet, skipping empty targets. A subset accepts iff it contains
    /// an NFA accepting state.
    pub fn from_nfa(nfa: &Nfa) -> Dfa {
        let mut dfa = Dfa::new();
        let Some(start) = nfa.start_state() else {
            return dfa;
        };

        let alphabet = nfa.alphabet();
        let accepts = |subset: &BTreeSet<StateId>| {
            subset.iter().any(|s| nfa.accepting_states().contains(s))
        };

        let initial = nfa.epsilon_closure(&BTreeSet::from([start]));
        let mut subset_ids: HashMap<BTreeSet<StateId>, StateId> = HashMap::new();
        let start_id = dfa.add_state("", accepts(&initial));
        subset_ids.insert(initial.clone(), start_id);

        let mut worklist = VecDeque::from([initial]);
        while let Some(current) = worklist.pop_front() {
            let current_id = subset_ids[&current];
            for &symbol in &alphabet {
                let next = nfa.epsilon_closure(&nfa.move_on(&current, symbol));
                if next.is_empty() {
                    continue;
                }
                let next_id = match subset_ids.get(&next) {
                    Some(&id) => id,
                    None => {
                        let id = dfa.add_state("", accepts(&next));
                        subset_ids.insert(next.clone(), id);
                        worklist.push_back(next);
                        id
                    }
                };
                dfa.insert_transition(current_id, next_id, symbol);
            }
        }

        dfa
    }

    /// Partition refinement. Starts from `{accepting, non-accepting}` and
    /// splits classes by their preimages under each symbol until stable,
    /// then builds the quotient automaton.
    ///
    /// The worklist keeps the two-list invariant: a split class that is
    /// still queued is replaced by both halves, otherwise only the smaller
    /// half is queued.
    pub fn minimize(&self) -> Dfa {
        let Some(start) = self.start_state() else {
            return self.clone();
        };
        if self.states().is_empty() {
            return self.clone();
        }

        let all: BTreeSet<StateId> = (0..self.states().len()).collect();
        let accepting = self.accepting_states().clone();
        let non_accepting: BTreeSet<StateId> = all.difference(&accepting).copied().collect();

        let mut partition: Vec<BTreeSet<StateId>> = [accepting, non_accepting]
            .into_iter()
            .filter(|class| !class.is_empty())
            .collect();
        let mut worklist = partition.clone();

        while let Some(splitter) = worklist.pop() {
            for &symbol in self.alphabet() {
                let preimage: BTreeSet<StateId> = (0..self.states().len())
                    .filter(|&q| {
                        self.next_state(q, symbol)
                            .is_some_and(|next| splitter.contains(&next))
                    })
                    .collect();
                if preimage.is_empty() {
                    continue;
                }

                let mut refined = Vec::with_capacity(partition.len());
                for class in partition.drain(..) {
                    let inside: BTreeSet<StateId> =
                        class.intersection(&preimage).copied().collect();
                    let outside: BTreeSet<StateId> =
                        class.difference(&preimage).copied().collect();

                    if inside.is_empty() || outside.is_empty() {
                        refined.push(class);
                        continue;
                    }

                    if let Some(queued) = worklist.iter().position(|w| *w == class) {
                        worklist.remove(queued);
                        worklist.push(inside.clone());
                        worklist.push(outside.clone());
                    } else if inside.len() <= outside.len() {
                        worklist.push(inside.clone());
                    } else {
                        worklist.push(outside.clone());
                    }

                    refined.push(inside);
                    refined.push(outside);
                }
                partition = refined;
            }
        }

        // quotient automaton: one state per class
        let mut class_of: HashMap<StateId, StateId> = HashMap::new();
        for (class_id, class) in partition.iter().enumerate() {
            for &state in class {
                class_of.insert(state, class_id);
            }
        }

        let mut minimized = Dfa::new();
        for class in &partition {
            let accepts = class.iter().any(|s| self.accepting_states().contains(s));
            minimized.add_state("", accepts);
        }
        minimized.force_start(class_of[&start]);

        // lift transitions; classes agree on their defined successors, so
        // the first entry per (class, symbol) wins and the rest are the
        // same edge again
        for t in self.transitions() {
            let from = class_of[&t.from];
            let to = class_of[&t.to];
            if minimized.next_state(from, t.symbol).is_none() {
                minimized.insert_transition(from, to, t.symbol);
            }
        }

        minimized
    }

    /// Product automaton accepting the intersection of both languages: a
    /// pair accepts iff both components accept. Symbols undefined on either
    /// side produce no pair.
    pub fn intersection(a: Dfa, b: Dfa) -> Dfa {
        let mut result = Dfa::new();
        let (Some(a_start), Some(b_start)) = (a.start_state(), b.start_state()) else {
            return result;
        };

        let mut alphabet = a.alphabet().clone();
        alphabet.extend(b.alphabet());

        let accepts = |sa: StateId, sb: StateId| {
            a.accepting_states().contains(&sa) && b.accepting_states().contains(&sb)
        };

        let mut pair_ids: HashMap<(StateId, StateId), StateId> = HashMap::new();
        let start_id = result.add_state("", accepts(a_start, b_start));
        pair_ids.insert((a_start, b_start), start_id);

        let mut worklist = VecDeque::from([(a_start, b_start)]);
        while let Some((sa, sb)) = worklist.pop_front() {
            let from = pair_ids[&(sa, sb)];
            for &symbol in &alphabet {
                let (Some(na), Some(nb)) = (a.next_state(sa, symbol), b.next_state(sb, symbol))
                else {
                    continue;
                };
                let to = match pair_ids.get(&(na, nb)) {
                    Some(&id) => id,
                    None => {
                        let id = result.add_state("", accepts(na, nb));
                        pair_ids.insert((na, nb), id);
                        worklist.push_back((na, nb));
                        id
                    }
                };
                result.insert_transition(from, to, symbol);
            }
        }

        result
    }

    /// Product automaton accepting the union of both languages: a pair
    /// accepts iff either component accepts. A symbol defined on only one
    /// side drives the other component into a sink (`None`) with no
    /// outgoing transitions, so every symbol of either alphabet is covered.
    pub fn union(a: Dfa, b: Dfa) -> Dfa {
        type Pair = (Option<StateId>, Option<StateId>);

        let mut result = Dfa::new();
        if a.start_state().is_none() && b.start_state().is_none() {
            return result;
        }

        let mut alphabet = a.alphabet().clone();
        alphabet.extend(b.alphabet());

        let accepts = |(sa, sb): Pair| {
            sa.is_some_and(|s| a.accepting_states().contains(&s))
                || sb.is_some_and(|s| b.accepting_states().contains(&s))
        };

        let initial: Pair = (a.start_state(), b.start_state());
        let mut pair_ids: HashMap<Pair, StateId> = HashMap::new();
        let start_id = result.add_state("", accepts(initial));
        pair_ids.insert(initial, start_id);

        let mut worklist = VecDeque::from([initial]);
        while let Some((sa, sb)) = worklist.pop_front() {
            let from = pair_ids[&(sa, sb)];
            for &symbol in &alphabet {
                let na = sa.and_then(|s| a.next_state(s, symbol));
                let nb = sb.and_then(|s| b.next_state(s, symbol));
                if na.is_none() && nb.is_none() {
                    continue;
                }
                let next = (na, nb);
                let to = match pair_ids.get(&next) {
                    Some(&id) => id,
                    None => {
                        let id = result.add_state("", accepts(next));
                        pair_ids.insert(next, id);
                        worklist.push_back(next);
                        id
                    }
                };
                result.insert_transition(from, to, symbol);
            }
        }

        result
    }

    /// Flips the accepting flag of every state. Transitions are untouched:
    /// inputs that fall off the table still reject, so complement a
    /// [completed](Dfa::complete) automaton when a total complement is
    /// needed.
    pub fn complement(mut self) -> Dfa {
        let mut accepting = BTreeSet::new();
        for state in &mut self.states {
            let flipped = !state.is_accepting();
            state.set_accepting(flipped);
            if flipped {
                accepting.insert(state.id());
            }
        }
        self.accepting = accepting;
        self
    }

    /// Totalizes the transition table over the automaton's alphabet by
    /// routing every undefined `(state, symbol)` pair into a fresh
    /// non-accepting trap state.
    pub fn complete(mut self) -> Dfa {
        if self.states.is_empty() || self.alphabet.is_empty() {
            return self;
        }

        let alphabet: Vec<u8> = self.alphabet.iter().copied().collect();
        let missing: Vec<(StateId, u8)> = (0..self.states.len())
            .flat_map(|state| alphabet.iter().map(move |&symbol| (state, symbol)))
            .filter(|&(state, symbol)| self.next_state(state, symbol).is_none())
            .collect();

        if missing.is_empty() {
            return self;
        }

        let trap = self.add_state("trap", false);
        for (from, symbol) in missing {
            self.insert_transition(from, trap, symbol);
        }
        for symbol in alphabet {
            self.insert_transition(trap, trap, symbol);
        }
        self
    }

    /// Moves the start flag without the id check; construction-internal.
    fn force_start(&mut self, id: StateId) {
        if let Some(old) = self.start {
            self.states[old].set_start(false);
        }
        self.start = Some(id);
        self.states[id].set_start(true);
    }
}

#[cfg(test)]
mod tests {
    use super::Dfa;
    use crate::fsm::Nfa;
    use crate::regex::Parser;

    fn compiled(pattern: &str) -> Nfa {
        Nfa::from_ast(&Parser::new(pattern).parse().unwrap()).unwrap()
    }

    fn dfa_of(pattern: &str) -> Dfa {
        Dfa::from_nfa(&compiled(pattern))
    }

    #[test]
    fn subset_construction_preserves_language() {
        let nfa = compiled("a(b|c)*d");
        let dfa = Dfa::from_nfa(&nfa);
        for input in ["ad", "abd", "acbd", "abcbcd"] {
            assert!(dfa.accepts(input), "should accept {:?}", input);
            assert_eq!(dfa.accepts(input), nfa.accepts(input));
        }
        for input in ["", "a", "ab", "abdd"] {
            assert!(!dfa.accepts(input), "should reject {:?}", input);
        }
    }

    #[test]
    fn subset_construction_of_startless_nfa_rejects_everything() {
        let dfa = Dfa::from_nfa(&Nfa::new());
        assert!(!dfa.accepts(""));
        assert!(!dfa.accepts("a"));
        assert!(dfa.states().is_empty());
    }

    #[test]
    fn scenario_dragon_book_minimization() {
        // (a|b)*abb minimizes to exactly 4 states
        let minimized = dfa_of("(a|b)*abb").minimize();
        assert_eq!(minimized.states().len(), 4);
        for input in ["abb", "aabb", "babb"] {
            assert!(minimized.accepts(input), "should accept {:?}", input);
        }
        for input in ["ab", ""] {
            assert!(!minimized.accepts(input), "should reject {:?}", input);
        }
    }

    #[test]
    fn minimization_never_grows_and_is_idempotent() {
        for pattern in ["a(b|c)*d", "(a|b)*abb", "a{2,3}", "ab|ac"] {
            let dfa = dfa_of(pattern);
            let min = dfa.minimize();
            assert!(min.states().len() <= dfa.states().len(), "{}", pattern);
            let again = min.minimize();
            assert_eq!(again.states().len(), min.states().len(), "{}", pattern);
        }
    }

    #[test]
    fn minimization_merges_duplicated_branches() {
        // two equivalent paths to acceptance collapse onto one
        let mut dfa = Dfa::new();
        let q0 = dfa.add_state("", false);
        let q1 = dfa.add_state("", false);
        let q2 = dfa.add_state("", false);
        let q3 = dfa.add_state("", true);
        let q4 = dfa.add_state("", true);
        dfa.add_transition(q0, q1, b'a').unwrap();
        dfa.add_transition(q0, q2, b'b').unwrap();
        dfa.add_transition(q1, q3, b'c').unwrap();
        dfa.add_transition(q2, q4, b'c').unwrap();

        let min = dfa.minimize();
        assert_eq!(min.states().len(), 3);
        assert!(min.accepts("ac"));
        assert!(min.accepts("bc"));
        assert!(!min.accepts("a"));
    }

    #[test]
    fn scenario_intersection() {
        let product = Dfa::intersection(dfa_of("a*b"), dfa_of("ab*"));
        assert!(product.accepts("ab"));
        assert!(!product.accepts("a"));
        assert!(!product.accepts("abb"));
        assert!(!product.accepts("aab"));
    }

    #[test]
    fn union_covers_symbols_from_either_alphabet() {
        let product = Dfa::union(dfa_of("a+"), dfa_of("b+"));
        assert!(product.accepts("a"));
        assert!(product.accepts("aaa"));
        assert!(product.accepts("bb"));
        assert!(!product.accepts(""));
        assert!(!product.accepts("ab"));
    }

    #[test]
    fn union_agrees_with_either_operand() {
        let (left, right) = (dfa_of("ab"), dfa_of("a*"));
        let product = Dfa::union(left.clone(), right.clone());
        for input in ["", "a", "ab", "aa", "b", "abb"] {
            assert_eq!(
                product.accepts(input),
                left.accepts(input) || right.accepts(input),
                "disagreement on {:?}",
                input
            );
        }
    }

    #[test]
    fn complement_flips_acceptance_on_defined_inputs() {
        let complemented = dfa_of("a+").complement();
        assert!(!complemented.accepts("a"));
        assert!(complemented.accepts(""));
        // undefined transitions still reject: `b` is outside the table
        assert!(!complemented.accepts("b"));
    }

    #[test]
    fn completed_complement_is_total() {
        let total = dfa_of("ab").complete();
        // completion makes every (state, symbol) pair defined
        for state in 0..total.states().len() {
            for &symbol in total.alphabet() {
                assert!(total.next_state(state, symbol).is_some());
            }
        }

        let complemented = total.complement();
        assert!(!complemented.accepts("ab"));
        assert!(complemented.accepts(""));
        assert!(complemented.accepts("ba"));
        assert!(complemented.accepts("aba"));
    }

    #[test]
    fn nfa_dfa_minimized_agree_on_sample_inputs() {
        let pattern = "(ab|a)*c?";
        let nfa = compiled(pattern);
        let dfa = Dfa::from_nfa(&nfa);
        let min = dfa.minimize();
        for input in ["", "a", "ab", "abc", "aab", "c", "ac", "abab", "b", "cc"] {
            let expected = nfa.accepts(input);
            assert_eq!(dfa.accepts(input), expected, "dfa disagrees on {:?}", input);
            assert_eq!(min.accepts(input), expected, "min disagrees on {:?}", input);
        }
    }
}
