// spindle-vm - Bytecode compiler and register virtual machine for the Spindle programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Compiled programs: a word stream plus its parsed local symbol table.
//!
//! A program image is laid out as: 4-word function header, executable
//! section, local symbol table. The image is identical in memory and on
//! disk (`.spo`); loading parses and validates the symbol table once,
//! after which symbols are addressed by index.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::function::Function;
use crate::opcode::{
    self, FUNCHDR_IDX_BODYLEN, FUNCHDR_IDX_NREGS, FUNCHDR_IDX_SYMCNT, FUNCHDR_LEN, SymKind, Word,
};
use crate::value::{Str, Value};

/// Error while loading a program image.
#[derive(Debug, Clone)]
pub enum LoadError {
    /// The image is shorter than a function header.
    Truncated,
    /// The header's body length is inconsistent with the image size.
    BadHeader,
    /// A symbol table entry has an unknown kind.
    BadSymbolKind { index: usize, kind: u8 },
    /// A name's actual length does not match the recorded length.
    NameLengthMismatch { index: usize },
    /// A function definition points outside the executable section.
    BadFunctionOffset { index: usize, offset: usize },
    /// The symbol table does not end exactly at the end of the image.
    TrailingData,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Truncated => write!(f, "bytecode is shorter than a program header"),
            LoadError::BadHeader => write!(f, "program header is inconsistent with image size"),
            LoadError::BadSymbolKind { index, kind } => {
                write!(f, "incorrect local symbol type {} (symbol {})", kind, index)
            }
            LoadError::NameLengthMismatch { index } => {
                write!(
                    f,
                    "symbol {}: actual name length does not match expected",
                    index
                )
            }
            LoadError::BadFunctionOffset { index, offset } => {
                write!(
                    f,
                    "symbol {}: function offset {:#x} is outside the executable section",
                    index, offset
                )
            }
            LoadError::TrailingData => {
                write!(f, "bytecode length does not match length in header")
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// An entry of the local symbol table.
#[derive(Debug, Clone)]
pub enum LocalSymbol {
    /// A string literal referenced by the code.
    StrConst(Rc<Str>),
    /// An unresolved global name. Rewritten to `Resolved` on first use.
    Stub(Rc<str>),
    /// A stub that has been resolved through the global table.
    Resolved(Value),
    /// A function defined in the executable section. `offset` points at
    /// the function header.
    FuncDef {
        name: Option<Rc<str>>,
        offset: usize,
    },
}

/// A compiled top-level unit: header, executable section, symbol table.
#[derive(Debug)]
pub struct Program {
    words: Vec<Word>,
    symtab: RefCell<Vec<LocalSymbol>>,
}

impl Program {
    /// Parse and validate a program image.
    pub fn from_words(words: Vec<Word>) -> Result<Rc<Program>, LoadError> {
        if words.len() < FUNCHDR_LEN {
            return Err(LoadError::Truncated);
        }

        let bodylen = words[FUNCHDR_IDX_BODYLEN] as usize;
        let nsyms = words[FUNCHDR_IDX_SYMCNT] as usize;
        let symtab_off = FUNCHDR_LEN + bodylen;
        if symtab_off > words.len() {
            return Err(LoadError::BadHeader);
        }

        let symtab = parse_symtab(&words, symtab_off, nsyms)?;
        Ok(Rc::new(Program {
            words,
            symtab: RefCell::new(symtab),
        }))
    }

    /// Load a program from raw bytes (the `.spo` on-disk format).
    pub fn from_bytes(bytes: &[u8]) -> Result<Rc<Program>, LoadError> {
        if bytes.len() % 4 != 0 {
            return Err(LoadError::BadHeader);
        }
        let words = bytes
            .chunks_exact(4)
            .map(|c| Word::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Program::from_words(words)
    }

    /// The raw image, identical to the on-disk layout.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Serialize to the `.spo` byte format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.words.len() * 4);
        for word in &self.words {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Body length of the top-level function, in words.
    pub fn body_len(&self) -> usize {
        self.words[FUNCHDR_IDX_BODYLEN] as usize
    }

    /// Register count of the top-level function.
    pub fn register_count(&self) -> usize {
        self.words[FUNCHDR_IDX_NREGS] as usize
    }

    /// Number of local symbols.
    pub fn symbol_count(&self) -> usize {
        self.symtab.borrow().len()
    }

    /// Fetch a symbol table entry.
    pub fn symbol(&self, index: usize) -> Option<LocalSymbol> {
        self.symtab.borrow().get(index).cloned()
    }

    /// Rewrite a stub in place with its resolved value. Resolved entries
    /// never revert to stubs.
    pub fn resolve_symbol(&self, index: usize, value: Value) {
        let mut symtab = self.symtab.borrow_mut();
        if let Some(entry) = symtab.get_mut(index) {
            debug_assert!(matches!(
                entry,
                LocalSymbol::Stub(_) | LocalSymbol::Resolved(_)
            ));
            *entry = LocalSymbol::Resolved(value);
        }
    }

    /// The name of a function definition symbol, used for stack traces.
    pub fn function_name(&self, index: usize) -> Option<Rc<str>> {
        match self.symtab.borrow().get(index) {
            Some(LocalSymbol::FuncDef { name, .. }) => name.clone(),
            _ => None,
        }
    }

    /// Build the top-level function for this program. The returned
    /// function owns the program.
    pub fn top_level_function(self: &Rc<Self>) -> Rc<Function> {
        Rc::new(Function::top_level(Rc::clone(self)))
    }
}

fn parse_symtab(
    words: &[Word],
    offset: usize,
    nsyms: usize,
) -> Result<Vec<LocalSymbol>, LoadError> {
    let mut symtab = Vec::with_capacity(nsyms);
    let mut ip = offset;

    for index in 0..nsyms {
        let header = *words.get(ip).ok_or(LoadError::TrailingData)?;
        ip += 1;
        let kind = opcode::opcode(header);

        match SymKind::from_u8(kind) {
            Some(SymKind::StrConst) => {
                let len = opcode::oplong(header) as usize;
                let (text, nwords) = opcode::unpack_cstr(&words[ip..], len)
                    .ok_or(LoadError::NameLengthMismatch { index })?;
                ip += nwords;
                symtab.push(LocalSymbol::StrConst(Rc::new(Str::new(text))));
            }
            Some(SymKind::SymStub) => {
                let len = opcode::oplong(header) as usize;
                let (name, nwords) = opcode::unpack_cstr(&words[ip..], len)
                    .ok_or(LoadError::NameLengthMismatch { index })?;
                ip += nwords;
                symtab.push(LocalSymbol::Stub(name.into()));
            }
            Some(SymKind::FuncDef) => {
                let fn_offset = *words.get(ip).ok_or(LoadError::TrailingData)? as usize;
                let namelen = *words.get(ip + 1).ok_or(LoadError::TrailingData)? as usize;
                ip += 2;
                let (name, nwords) = opcode::unpack_cstr(&words[ip..], namelen)
                    .ok_or(LoadError::NameLengthMismatch { index })?;
                ip += nwords;

                if fn_offset + FUNCHDR_LEN > offset {
                    return Err(LoadError::BadFunctionOffset {
                        index,
                        offset: fn_offset,
                    });
                }

                let name = if name.is_empty() {
                    None
                } else {
                    Some(name.into())
                };
                symtab.push(LocalSymbol::FuncDef {
                    name,
                    offset: fn_offset,
                });
            }
            None => return Err(LoadError::BadSymbolKind { index, kind }),
        }
    }

    if ip != words.len() {
        return Err(LoadError::TrailingData);
    }
    Ok(symtab)
}
