//! Builds small game images in memory for the integration tests
#![allow(dead_code)]

use lantern::config::Options;
use lantern::dictionary::WordClasses;
use lantern::game::{Game, ATTRIBUTE_SCALAR, ATTRIBUTE_SET, ATTRIBUTE_STRING, EOF};
use lantern::header::{HEADER_WORDS, MAGIC, VERSION};
use lantern::host_headless::HeadlessHost;
use lantern::instruction::{CurVar, Instruction, Op};
use lantern::interpreter::Interpreter;

pub fn op(op: Op) -> u32 {
    Instruction::Statement(op).encode()
}

pub fn int(value: i32) -> u32 {
    Instruction::Constant(value).encode()
}

pub fn var(var: CurVar) -> u32 {
    Instruction::CurVar(var).encode()
}

/// Push parameter `n` of the current command
pub fn param(n: i32) -> Vec<u32> {
    vec![int(n), var(CurVar::Param)]
}

/// Grammar element, children are the alternatives list that follows it
pub enum Elem {
    Word(i32, Vec<Elem>),
    Param(u32, Vec<Elem>),
    Eos(i32),
}

pub enum Attr {
    Scalar(i32),
    Set(Vec<u32>),
    Text(&'static str),
}

pub struct Inst {
    pub name: &'static str,
    pub class: u32,
    pub location: usize,
    pub container: bool,
    pub is_location: bool,
    pub pronoun: i32,
    pub attributes: Vec<(i32, Attr)>,
}

impl Inst {
    pub fn new(name: &'static str, location: usize) -> Self {
        Inst {
            name,
            class: 0,
            location,
            container: false,
            is_location: false,
            pronoun: 0,
            attributes: Vec::new(),
        }
    }

    pub fn location(mut self) -> Self {
        self.is_location = true;
        self
    }

    pub fn container(mut self) -> Self {
        self.container = true;
        self
    }

    pub fn class(mut self, class: u32) -> Self {
        self.class = class;
        self
    }

    pub fn pronoun(mut self, pronoun: i32) -> Self {
        self.pronoun = pronoun;
        self
    }

    pub fn attribute(mut self, code: i32, value: Attr) -> Self {
        self.attributes.push((code, value));
        self
    }
}

/// One step of an actor script
#[derive(Default)]
pub struct Step {
    pub after: Option<Vec<u32>>,
    pub condition: Option<Vec<u32>>,
    pub statements: Vec<u32>,
}

impl Step {
    pub fn new(statements: Vec<u32>) -> Self {
        Step {
            statements,
            ..Step::default()
        }
    }

    pub fn after(mut self, block: Vec<u32>) -> Self {
        self.after = Some(block);
        self
    }

    pub fn condition(mut self, block: Vec<u32>) -> Self {
        self.condition = Some(block);
        self
    }
}

struct DictWord {
    word: &'static str,
    code: i32,
    classes: u32,
    nouns: Vec<u32>,
    adjectives: Vec<u32>,
}

#[derive(Default)]
pub struct ImageBuilder {
    text: Vec<u8>,
    words: Vec<DictWord>,
    syntaxes: Vec<(i32, Vec<Elem>)>,
    instances: Vec<Inst>,
    verbs: Vec<(i32, Vec<u32>)>,
    events: Vec<Vec<u32>>,
    classes: Vec<u32>,
    exits: Vec<(usize, usize)>,
    scripts: Vec<(i32, Vec<Step>)>,
    start: Vec<u32>,
    scores: Vec<i32>,
    maximum_score: i32,
    hero: usize,
}

fn intern(text: &mut Vec<u8>, s: &str) -> (u32, u32) {
    let fpos = text.len() as u32;
    text.extend_from_slice(s.as_bytes());
    (fpos, s.len() as u32)
}

fn write_list(image: &mut Vec<u32>, items: &[u32]) -> u32 {
    if items.is_empty() {
        return 0;
    }
    let address = image.len() as u32;
    image.extend_from_slice(items);
    image.push(EOF);
    address
}

fn write_elements(image: &mut Vec<u32>, list: &[Elem]) -> u32 {
    let next: Vec<u32> = list
        .iter()
        .map(|elem| match elem {
            Elem::Word(_, children) | Elem::Param(_, children) => write_elements(image, children),
            Elem::Eos(_) => 0,
        })
        .collect();
    let address = image.len() as u32;
    for (elem, next) in list.iter().zip(next) {
        match elem {
            Elem::Word(code, _) => image.extend_from_slice(&[*code as u32, 0, next]),
            Elem::Param(flags, _) => image.extend_from_slice(&[0, *flags, next]),
            Elem::Eos(verb) => image.extend_from_slice(&[-2i32 as u32, *verb as u32, 0]),
        }
    }
    image.push(EOF);
    address
}

impl ImageBuilder {
    pub fn new() -> Self {
        ImageBuilder {
            start: vec![op(Op::Return)],
            hero: 1,
            ..ImageBuilder::default()
        }
    }

    /// Code that prints `s` with PRINT
    pub fn print(&mut self, s: &str) -> Vec<u32> {
        let (fpos, len) = intern(&mut self.text, s);
        vec![int(len as i32), int(fpos as i32), op(Op::Print)]
    }

    /// Code that pushes `s` with GETSTR
    pub fn string(&mut self, s: &str) -> Vec<u32> {
        let (fpos, len) = intern(&mut self.text, s);
        vec![int(len as i32), int(fpos as i32), op(Op::GetStr)]
    }

    pub fn word(&mut self, word: &'static str, code: i32, classes: u32) -> &mut Self {
        self.words.push(DictWord {
            word,
            code,
            classes,
            nouns: Vec::new(),
            adjectives: Vec::new(),
        });
        self
    }

    pub fn noun(&mut self, word: &'static str, code: i32, refs: &[u32]) -> &mut Self {
        self.words.push(DictWord {
            word,
            code,
            classes: WordClasses::NOUN,
            nouns: refs.to_vec(),
            adjectives: Vec::new(),
        });
        self
    }

    pub fn adjective(&mut self, word: &'static str, code: i32, refs: &[u32]) -> &mut Self {
        self.words.push(DictWord {
            word,
            code,
            classes: WordClasses::ADJECTIVE,
            nouns: Vec::new(),
            adjectives: refs.to_vec(),
        });
        self
    }

    pub fn syntax(&mut self, verb_word: i32, elements: Vec<Elem>) -> &mut Self {
        self.syntaxes.push((verb_word, elements));
        self
    }

    pub fn instance(&mut self, instance: Inst) -> &mut Self {
        self.instances.push(instance);
        self
    }

    pub fn verb(&mut self, code: i32, block: Vec<u32>) -> &mut Self {
        self.verbs.push((code, block));
        self
    }

    pub fn event(&mut self, block: Vec<u32>) -> &mut Self {
        self.events.push(block);
        self
    }

    /// Add class number `classes.len() + 1` below `parent`
    pub fn class(&mut self, parent: u32) -> &mut Self {
        self.classes.push(parent);
        self
    }

    pub fn exit(&mut self, from: usize, to: usize) -> &mut Self {
        self.exits.push((from, to));
        self
    }

    pub fn script(&mut self, code: i32, steps: Vec<Step>) -> &mut Self {
        self.scripts.push((code, steps));
        self
    }

    pub fn start(&mut self, block: Vec<u32>) -> &mut Self {
        self.start = block;
        self
    }

    pub fn scores(&mut self, scores: &[i32], maximum: i32) -> &mut Self {
        self.scores = scores.to_vec();
        self.maximum_score = maximum;
        self
    }

    pub fn hero(&mut self, hero: usize) -> &mut Self {
        self.hero = hero;
        self
    }

    pub fn build(&self) -> Vec<u32> {
        let mut text = self.text.clone();
        let word_text: Vec<(u32, u32)> =
            self.words.iter().map(|w| intern(&mut text, w.word)).collect();
        let name_text: Vec<(u32, u32)> =
            self.instances.iter().map(|i| intern(&mut text, i.name)).collect();
        let mut string_init = Vec::new();
        for (index, instance) in self.instances.iter().enumerate() {
            for (code, value) in &instance.attributes {
                if let Attr::Text(s) = value {
                    let (fpos, len) = intern(&mut text, s);
                    string_init.extend_from_slice(&[index as u32 + 1, *code as u32, fpos, len]);
                }
            }
        }

        let mut code = self.start.clone();
        let mut verbs = Vec::new();
        for (verb, block) in &self.verbs {
            verbs.extend_from_slice(&[*verb as u32, code.len() as u32]);
            code.extend_from_slice(block);
        }
        let mut events = Vec::new();
        for block in &self.events {
            events.push(code.len() as u32);
            code.extend_from_slice(block);
        }
        let mut block_address = |block: &Option<Vec<u32>>| match block {
            Some(block) => {
                let address = code.len() as u32;
                code.extend_from_slice(block);
                address
            }
            None => 0,
        };
        let mut steps = Vec::new();
        for (_, script) in &self.scripts {
            let mut records = Vec::new();
            for step in script {
                let after = block_address(&step.after);
                let condition = block_address(&step.condition);
                let statements = block_address(&Some(step.statements.clone()));
                records.extend_from_slice(&[after, condition, statements]);
            }
            steps.push(records);
        }

        let mut image = vec![0u32; HEADER_WORDS];

        let text_area = image.len() as u32;
        image.push(text.len() as u32);
        for chunk in text.chunks(4) {
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            image.push(u32::from_be_bytes(bytes));
        }

        let mut records = Vec::new();
        for (word, (fpos, len)) in self.words.iter().zip(&word_text) {
            let nouns = write_list(&mut image, &word.nouns);
            let adjectives = write_list(&mut image, &word.adjectives);
            records.extend_from_slice(&[
                *fpos,
                *len,
                word.code as u32,
                word.classes,
                nouns,
                adjectives,
            ]);
        }
        let dictionary = write_list(&mut image, &records);

        let mut records = Vec::new();
        for (verb_word, elements) in &self.syntaxes {
            let list = write_elements(&mut image, elements);
            records.extend_from_slice(&[*verb_word as u32, list]);
        }
        let syntax_table = write_list(&mut image, &records);

        let mut set_init = Vec::new();
        let mut blocks = Vec::new();
        for (index, instance) in self.instances.iter().enumerate() {
            let mut records = Vec::new();
            for (code, value) in &instance.attributes {
                let (kind, value) = match value {
                    Attr::Scalar(v) => (ATTRIBUTE_SCALAR, *v as u32),
                    Attr::Set(members) => {
                        let list = write_list(&mut image, members);
                        set_init.extend_from_slice(&[index as u32 + 1, *code as u32, list]);
                        (ATTRIBUTE_SET, 0)
                    }
                    Attr::Text(_) => (ATTRIBUTE_STRING, 0),
                };
                records.extend_from_slice(&[*code as u32, kind, value, 0]);
            }
            blocks.push(write_list(&mut image, &records));
        }
        let instance_table = image.len() as u32;
        for ((instance, (fpos, len)), attributes) in
            self.instances.iter().zip(&name_text).zip(blocks)
        {
            image.extend_from_slice(&[
                *fpos,
                *len,
                instance.class,
                instance.location as u32,
                attributes,
                instance.container as u32,
                instance.is_location as u32,
                instance.pronoun as u32,
            ]);
        }

        let set_init_table = write_list(&mut image, &set_init);
        let string_init_table = write_list(&mut image, &string_init);
        let verb_table = write_list(&mut image, &verbs);
        let event_table = write_list(&mut image, &events);
        let scores: Vec<u32> = self.scores.iter().map(|s| *s as u32).collect();
        let score_table = write_list(&mut image, &scores);
        let class_table = write_list(&mut image, &self.classes);
        let exits: Vec<u32> = self
            .exits
            .iter()
            .flat_map(|(from, to)| [*from as u32, *to as u32])
            .collect();
        let exit_table = write_list(&mut image, &exits);
        let mut records = Vec::new();
        for ((script, _), steps) in self.scripts.iter().zip(&steps) {
            let list = write_list(&mut image, steps);
            records.extend_from_slice(&[*script as u32, list]);
        }
        let script_table = write_list(&mut image, &records);

        let code_start = image.len() as u32;
        image.extend_from_slice(&code);

        let header = [
            MAGIC,
            VERSION,
            self.instances.len() as u32,
            dictionary,
            syntax_table,
            instance_table,
            set_init_table,
            string_init_table,
            verb_table,
            event_table,
            score_table,
            self.maximum_score as u32,
            text_area,
            code_start,
            code.len() as u32,
            0,
            self.hero as u32,
            class_table,
            exit_table,
            script_table,
        ];
        image[..HEADER_WORDS].copy_from_slice(&header);
        image
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.build().iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    pub fn game(&self) -> Game {
        Game::from_words(&self.build()).expect("test image should load")
    }
}

// Instances of the cave game
pub const CAVE: usize = 1;
pub const HERO: usize = 2;
pub const LAMP: usize = 3;
pub const COIN: usize = 4;
pub const BOX: usize = 5;
pub const LIMBO: usize = 6;

// Attributes
pub const WEIGHT: i32 = 1;
pub const CARRIED: i32 = 3;
pub const DESCRIPTION: i32 = 4;

// Word codes
pub const IT: i32 = 8;

/// A one-room game exercising every part of the interpreter
pub fn cave() -> ImageBuilder {
    let mut b = ImageBuilder::new();
    b.word("look", 1, WordClasses::VERB)
        .word("take", 2, WordClasses::VERB)
        .word("drop", 3, WordClasses::VERB)
        .noun("lamp", 4, &[LAMP as u32])
        .noun("coin", 5, &[COIN as u32])
        .noun("box", 6, &[BOX as u32])
        .word("and", 7, WordClasses::CONJUNCTION)
        .word("it", IT, WordClasses::PRONOUN)
        .word("all", 9, WordClasses::ALL)
        .word("say", 10, WordClasses::VERB)
        .word("score", 11, WordClasses::VERB)
        .word("the", 12, WordClasses::NOISE)
        .word("in", 13, WordClasses::PREPOSITION)
        .word("put", 14, WordClasses::VERB)
        .adjective("brass", 15, &[LAMP as u32])
        .word("wait", 16, WordClasses::VERB)
        .word("weigh", 17, WordClasses::VERB)
        .word("crash", 18, WordClasses::VERB)
        .word("inventory", 19, WordClasses::VERB)
        .word("heaviest", 20, WordClasses::VERB);

    b.syntax(1, vec![Elem::Eos(101)])
        .syntax(2, vec![Elem::Param(1, vec![Elem::Eos(102)])])
        .syntax(3, vec![Elem::Param(1, vec![Elem::Eos(103)])])
        .syntax(
            14,
            vec![Elem::Param(0, vec![Elem::Word(13, vec![Elem::Param(0, vec![Elem::Eos(104)])])])],
        )
        .syntax(10, vec![Elem::Param(0, vec![Elem::Eos(105)])])
        .syntax(11, vec![Elem::Eos(106)])
        .syntax(16, vec![Elem::Eos(107)])
        .syntax(17, vec![Elem::Eos(108)])
        .syntax(18, vec![Elem::Eos(109)])
        .syntax(19, vec![Elem::Eos(110)])
        .syntax(20, vec![Elem::Eos(111)]);

    b.instance(
        Inst::new("cave", 0)
            .location()
            .attribute(WEIGHT, Attr::Scalar(0))
            .attribute(DESCRIPTION, Attr::Text("You are in a damp cave.")),
    )
    .instance(
        Inst::new("you", CAVE)
            .attribute(WEIGHT, Attr::Scalar(0))
            .attribute(CARRIED, Attr::Set(vec![])),
    )
    .instance(
        Inst::new("lamp", CAVE)
            .pronoun(IT)
            .attribute(WEIGHT, Attr::Scalar(5)),
    )
    .instance(
        Inst::new("coin", CAVE)
            .pronoun(IT)
            .attribute(WEIGHT, Attr::Scalar(1)),
    )
    .instance(
        Inst::new("box", CAVE)
            .container()
            .attribute(WEIGHT, Attr::Scalar(3)),
    )
    .instance(
        Inst::new("limbo", 0)
            .location()
            .attribute(WEIGHT, Attr::Scalar(0)),
    )
    .hero(HERO)
    .scores(&[10, 10], 20);

    let newline = b.print("\n");
    let start = [b.print("Welcome to the cave.\n"), vec![op(Op::Return)]].concat();
    b.start(start);

    // look: say the location description
    let look = [
        vec![var(CurVar::CurLoc), int(DESCRIPTION), op(Op::AttrStr), op(Op::SayStr)],
        newline.clone(),
        vec![op(Op::Return)],
    ]
    .concat();

    // take: move to the hero and remember in the carried set
    let take = [
        vec![int(HERO as i32)],
        param(1),
        vec![op(Op::Locate)],
        vec![int(HERO as i32), int(CARRIED), op(Op::AttrSet)],
        param(1),
        vec![op(Op::Include), int(HERO as i32), int(CARRIED), op(Op::SetSet)],
        b.print("Taken.\n"),
        vec![op(Op::Return)],
    ]
    .concat();

    let drop = [
        vec![int(CAVE as i32)],
        param(1),
        vec![op(Op::Locate)],
        vec![int(HERO as i32), int(CARRIED), op(Op::AttrSet)],
        param(1),
        vec![op(Op::Exclude), int(HERO as i32), int(CARRIED), op(Op::SetSet)],
        b.print("Dropped.\n"),
        vec![op(Op::Return)],
    ]
    .concat();

    let put = [
        param(2),
        param(1),
        vec![op(Op::Locate)],
        b.print("Done.\n"),
        vec![op(Op::Return)],
    ]
    .concat();

    let say = [
        param(1),
        vec![int(0), op(Op::Say)],
        newline.clone(),
        vec![op(Op::Return)],
    ]
    .concat();

    let score = vec![int(0), op(Op::Score), op(Op::Return)];

    // wait: the bell rings at the end of this turn
    let wait = [
        b.print("Time passes.\n"),
        vec![int(0), int(CAVE as i32), int(1), op(Op::Schedule), op(Op::Return)],
    ]
    .concat();

    // weigh: sum of all weights
    let weigh = [
        vec![
            int(0),
            var(CurVar::MaxInstance),
            int(1),
            op(Op::Loop),
            op(Op::Dup),
            int(WEIGHT),
            op(Op::Attribute),
            op(Op::Sum),
            op(Op::LoopEnd),
            op(Op::SayInt),
        ],
        newline.clone(),
        vec![op(Op::Return)],
    ]
    .concat();

    // crash: change something, then fail
    let crash = vec![
        int(99),
        int(LAMP as i32),
        int(WEIGHT),
        op(Op::Set),
        int(1),
        int(0),
        op(Op::Div),
        op(Op::Return),
    ];

    let inventory = [
        vec![
            int(HERO as i32),
            int(CARRIED),
            op(Op::AttrSet),
            op(Op::SetSize),
            op(Op::SayInt),
        ],
        newline.clone(),
        vec![op(Op::Return)],
    ]
    .concat();

    // heaviest: weight of the heaviest instance
    let heaviest = [
        vec![
            int(0),
            var(CurVar::MaxInstance),
            int(1),
            op(Op::Loop),
            op(Op::Dup),
            int(WEIGHT),
            op(Op::Attribute),
            op(Op::Max),
            op(Op::LoopEnd),
            op(Op::SayInt),
        ],
        newline.clone(),
        vec![op(Op::Return)],
    ]
    .concat();

    let bell = [
        b.print("A bell rings.\n"),
        vec![int(1), op(Op::Score), op(Op::Return)],
    ]
    .concat();

    b.verb(101, look)
        .verb(102, take)
        .verb(103, drop)
        .verb(104, put)
        .verb(105, say)
        .verb(106, score)
        .verb(107, wait)
        .verb(108, weigh)
        .verb(109, crash)
        .verb(110, inventory)
        .verb(111, heaviest)
        .event(bell);
    b
}

pub fn start(builder: &ImageBuilder, options: Options) -> Interpreter<HeadlessHost> {
    Interpreter::new(builder.game(), HeadlessHost::new(), options).expect("game should start")
}

/// Start the cave game and play `commands`, returning the interpreter
pub fn play(commands: &[&str]) -> Interpreter<HeadlessHost> {
    let mut interpreter = start(&cave(), Options::default());
    for command in commands {
        interpreter.turn(command).expect("turn should not fail");
    }
    interpreter
}

/// Output lines since the last call
pub fn take_output(interpreter: &mut Interpreter<HeadlessHost>) -> String {
    let output = interpreter.host.get_output();
    interpreter.host.clear_output();
    output
}
