use fncli::{ArgSpec, Command, Param, Signature, Version};

fn main() {
    let command = Command::new(
        "greeter",
        Signature::new()
            .add(Param::optional("name", "world"))
            .add(Param::flag("shout", false))
            .add(
                Param::keyword("punctuation", "!")
                    .spec(ArgSpec::new().choices(["!", ".", "?"]).alias("p")),
            ),
        |args| {
            let mut greeting = format!(
                "Hello, {}{}",
                args.str("name").unwrap(),
                args.str("punctuation").unwrap()
            );
            if args.flag("shout") {
                greeting = greeting.to_uppercase();
            }
            Ok(Some(greeting))
        },
    )
    .about("Greet someone from the command line.")
    .extend(Version::new("0.1.0"))
    .build();

    command.execute();
}
