use fncli::{bash_completion_script, ArgSpec, Command, Param, Signature};

fn main() {
    let command = Command::new(
        "demo_completion",
        Signature::new()
            .add(
                Param::optional("fruit", "apple")
                    .spec(ArgSpec::new().choices(["apple", "banana", "cherry"])),
            )
            .add(
                Param::flag("script", false)
                    .spec(ArgSpec::new().help("print the bash completion registration")),
            ),
        |args| {
            if args.flag("script") {
                // eval "$(demo_completion --script)" to enable tab completion.
                return Ok(Some(bash_completion_script("demo_completion")));
            }
            Ok(Some(format!("picked {}", args.str("fruit").unwrap())))
        },
    )
    .prog("demo_completion")
    .build();

    command.execute();
}
