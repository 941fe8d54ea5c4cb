use crate::commands::{cache_key, candidates, check};

pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

pub struct CommandExamples {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExamples] {
    &[
        CommandExamples {
            name: "check",
            groups: check::EXAMPLES,
        },
        CommandExamples {
            name: "candidates",
            groups: candidates::EXAMPLES,
        },
        CommandExamples {
            name: "cache-key",
            groups: cache_key::EXAMPLES,
        },
    ]
}
