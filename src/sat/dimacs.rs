use std::collections::{HashMap, HashSet};
use std::{fs, io, path, str};
use flate2::read::GzDecoder;
use crate::sat::formula::{Lit, Var, VarMap};
use crate::sat::{SolveRes, Solver};


/// Parses a (possibly gzipped) DIMACS CNF file directly into `solver`,
/// returning the substitution needed to translate the solver's internal
/// variables back to the file's own numbering when writing a result.
pub fn parse_file<P: AsRef<path::Path>, S: Solver>(path: &P, solver: &mut S, validate: bool) -> io::Result<VarMap<i32>> {
    let open = || fs::File::open(path).map(io::BufReader::new);
    match GzDecoder::new(open()?) {
        Ok(mut gz) => parse(&mut gz, solver, validate),
        Err(_) => parse(&mut open()?, solver, validate),
    }
}

pub fn parse<R: io::Read, S: Solver>(stream: &mut R, solver: &mut S, validate: bool) -> io::Result<VarMap<i32>> {
    let mut subst = Subst::new(solver);
    DimacsParser::parse(stream, validate, |cl| subst.add_clause(cl))?;
    Ok(subst.backward_subst)
}


/// Writes a model as a DIMACS solution line: `1 -2 3 ... 0`, translating
/// each internal literal back to the file's own variable numbering.
pub fn write_model<W: io::Write>(stream: &mut W, backward_subst: &VarMap<i32>, model: &[Lit]) -> io::Result<()> {
    for &lit in model.iter() {
        let var_id = backward_subst[&lit.var()];
        write!(stream, "{} ", if lit.sign() { -var_id } else { var_id })?;
    }
    writeln!(stream, "0")?;
    Ok(())
}

/// Writes the outcome of a solve to `stream` in a plain DIMACS-solution
/// style: a `SAT`/`UNSAT`/`INDET` status line, followed by the model (if
/// any) via `write_model`.
pub fn write_result<W: io::Write, S>(mut stream: W, result: SolveRes<S>, backward_subst: &VarMap<i32>) -> io::Result<()> {
    match result {
        SolveRes::UnSAT(_) => writeln!(stream, "UNSAT"),
        SolveRes::Interrupted(..) => writeln!(stream, "INDET"),
        SolveRes::SAT(model, _) => {
            writeln!(stream, "SAT")?;
            write_model(&mut stream, backward_subst, &model)
        }
    }
}


/// Re-parses `path` and checks that every clause is satisfied by `model` —
/// the self-check `lib.rs` runs after a `SATISFIABLE` result.
pub fn validate_model_file<P: AsRef<path::Path>>(path: &P, backward_subst: &VarMap<i32>, model: &[Lit]) -> io::Result<bool> {
    let open = || fs::File::open(path).map(io::BufReader::new);
    match GzDecoder::new(open()?) {
        Ok(mut gz) => validate_model(&mut gz, backward_subst, model),
        Err(_) => validate_model(&mut open()?, backward_subst, model),
    }
}

pub fn validate_model<R: io::Read>(stream: &mut R, backward_subst: &VarMap<i32>, model: &[Lit]) -> io::Result<bool> {
    let mut lits = HashSet::new();
    for &lit in model.iter() {
        let var_id = backward_subst[&lit.var()];
        let lit_id = if lit.sign() { -var_id } else { var_id };
        lits.insert(lit_id);
    }

    let mut ok = true;
    DimacsParser::parse(stream, false, |cl| {
        if !cl.iter().any(|lit_id| lits.contains(lit_id)) {
            ok = false;
        }
    })?;

    Ok(ok)
}


struct Subst<'s, S: 's> {
    solver: &'s mut S,
    forward_subst: HashMap<i32, Var>,
    backward_subst: VarMap<i32>,
}

impl<'s, S: Solver> Subst<'s, S> {
    pub fn new(solver: &'s mut S) -> Self {
        Subst {
            solver,
            forward_subst: HashMap::new(),
            backward_subst: VarMap::new(),
        }
    }

    pub fn add_clause(&mut self, raw: Vec<i32>) {
        let lits: Vec<Lit> = raw.iter().map(|&lit_id| self.lit_by_id(lit_id)).collect();
        self.solver.add_clause(&lits[..]);
    }

    fn lit_by_id(&mut self, lit_id: i32) -> Lit {
        while (lit_id.abs() as usize) > self.solver.n_vars() {
            let idx = (self.solver.n_vars() + 1) as i32;
            self.new_var(idx);
        }

        self.forward_subst[&lit_id.abs()].sign_lit(lit_id < 0)
    }

    fn new_var(&mut self, var_id: i32) {
        let v = self.solver.new_var(None, true);
        self.forward_subst.insert(var_id, v);
        self.backward_subst.insert(&v, var_id);
    }
}


/// A small recursive-descent reader for the DIMACS `p cnf` format: comment
/// lines (`c ...`), the `p cnf <vars> <clauses>` header, then clauses as
/// whitespace-separated signed integers terminated by `0`.
struct DimacsParser<'p> {
    reader: str::Chars<'p>,
    cur: Option<char>,
    vars: HashSet<i32>,
    clauses: usize,
}

impl<'p> DimacsParser<'p> {
    pub fn parse<R: io::Read, F: FnMut(Vec<i32>)>(reader: &'p mut R, validate: bool, clause: F) -> io::Result<()> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;

        let mut p = DimacsParser {
            reader: buf.chars(),
            cur: None,
            vars: HashSet::new(),
            clauses: 0,
        };
        p.advance()?;
        p.run(validate, clause)
    }

    fn run<F: FnMut(Vec<i32>)>(&mut self, validate: bool, mut clause: F) -> io::Result<()> {
        enum State {
            Waiting,
            Parsing(usize, usize),
        }

        let mut state = State::Waiting;
        loop {
            self.skip_whitespace()?;
            match state {
                State::Waiting => match self.current() {
                    Some('c') => self.skip_line()?,

                    _ => {
                        self.consume("p cnf")?;
                        let vars = self.next_uint()?;
                        let clauses = self.next_uint()?;
                        state = State::Parsing(vars, clauses);
                    }
                },

                State::Parsing(vars, clauses) => match self.current() {
                    Some('c') => self.skip_line()?,

                    None => {
                        if validate {
                            if clauses != self.clauses {
                                return Err(io::Error::new(
                                    io::ErrorKind::Other,
                                    format!("PARSE ERROR! DIMACS header mismatch: {} clauses declared, {} found", clauses, self.clauses),
                                ));
                            }

                            if vars < self.vars.len() {
                                return Err(io::Error::new(
                                    io::ErrorKind::Other,
                                    format!("PARSE ERROR! DIMACS header mismatch: {} vars declared, {} discovered", vars, self.vars.len()),
                                ));
                            }
                        }
                        return Ok(());
                    }

                    _ => {
                        let c = self.parse_clause()?;
                        clause(c);
                    }
                },
            }
        }
    }

    fn parse_clause(&mut self) -> io::Result<Vec<i32>> {
        let mut lits = Vec::new();
        loop {
            let lit = self.next_int()?;
            if lit == 0 {
                self.clauses += 1;
                return Ok(lits);
            } else {
                self.vars.insert(lit.abs());
                lits.push(lit);
            }
        }
    }

    #[inline]
    fn advance(&mut self) -> io::Result<()> {
        self.cur = self.reader.next();
        Ok(())
    }

    #[inline]
    fn current(&self) -> Option<char> {
        self.cur
    }

    fn skip_whitespace(&mut self) -> io::Result<()> {
        loop {
            match self.cur {
                None => break,
                Some(c) if !c.is_whitespace() => break,
                _ => self.advance()?,
            }
        }
        Ok(())
    }

    fn skip_line(&mut self) -> io::Result<()> {
        loop {
            match self.cur {
                None => break,
                Some('\n') => {
                    self.advance()?;
                    break;
                }
                _ => self.advance()?,
            }
        }
        Ok(())
    }

    fn consume(&mut self, target: &str) -> io::Result<()> {
        for tc in target.chars() {
            match self.cur {
                Some(c) if c == tc => self.advance()?,
                _ => return Err(io::Error::new(io::ErrorKind::Other, format!("failed to consume; expected '{}'", target))),
            }
        }
        Ok(())
    }

    fn read_int_body(&mut self) -> io::Result<usize> {
        let mut len: usize = 0;
        let mut value = 0;
        loop {
            match self.cur.and_then(|c| c.to_digit(10)) {
                Some(d) => {
                    value = value * 10 + (d as usize);
                    len += 1;
                    self.advance()?
                }

                _ if len > 0 => return Ok(value),

                _ => return Err(io::Error::new(io::ErrorKind::Other, "int expected")),
            }
        }
    }

    fn next_int(&mut self) -> io::Result<i32> {
        self.skip_whitespace()?;
        let sign = match self.cur {
            Some('+') => {
                self.advance()?;
                1
            }
            Some('-') => {
                self.advance()?;
                -1
            }
            _ => 1,
        };

        let val = self.read_int_body()?;
        Ok(sign * (val as i32))
    }

    fn next_uint(&mut self) -> io::Result<usize> {
        self.skip_whitespace()?;
        if let Some('+') = self.cur {
            self.advance()?;
        }
        self.read_int_body()
    }
}
