/// Get the mnemonic of a statement opcode
pub fn get_statement_name(code: u32) -> &'static str {
    match code {
        1 => "PRINT",
        2 => "SAYINT",
        3 => "SAYSTR",
        4 => "SAY",
        5 => "GETSTR",
        6 => "DUP",
        7 => "POP",
        8 => "QUIT",
        9 => "SAVE",
        10 => "RESTORE",
        11 => "SCORE",
        12 => "VISITS",
        13 => "SCHEDULE",
        14 => "CANCEL",
        15 => "MAKE",
        16 => "SET",
        17 => "SETSTR",
        18 => "SETSET",
        19 => "NEWSET",
        20 => "UNION",
        21 => "INCR",
        22 => "DECR",
        23 => "INCLUDE",
        24 => "EXCLUDE",
        25 => "SETSIZE",
        26 => "SETMEMB",
        27 => "INSET",
        28 => "CONTSIZE",
        29 => "CONTMEMB",
        30 => "ATTRIBUTE",
        31 => "ATTRSTR",
        32 => "ATTRSET",
        33 => "LOCATE",
        34 => "WHERE",
        35 => "LOCATION",
        36 => "IN",
        37 => "IF",
        38 => "ELSE",
        39 => "ENDIF",
        40 => "AND",
        41 => "OR",
        42 => "NE",
        43 => "EQ",
        44 => "STREQ",
        45 => "STREXACT",
        46 => "LE",
        47 => "GE",
        48 => "LT",
        49 => "GT",
        50 => "PLUS",
        51 => "MINUS",
        52 => "MULT",
        53 => "DIV",
        54 => "NOT",
        55 => "RND",
        56 => "BTW",
        57 => "CONCAT",
        58 => "CONTAINS",
        59 => "MAX",
        60 => "MIN",
        61 => "SUM",
        62 => "COUNT",
        63 => "FRAME",
        64 => "GETLOCAL",
        65 => "SETLOCAL",
        66 => "ENDFRAME",
        67 => "LOOP",
        68 => "LOOPNEXT",
        69 => "LOOPEND",
        70 => "RETURN",
        71 => "ISA",
        72 => "AT",
        73 => "HERE",
        74 => "NEAR",
        75 => "NEARBY",
        76 => "EMPTY",
        77 => "DEPEND",
        78 => "DEPEXEC",
        79 => "DEPCASE",
        80 => "DEPELSE",
        81 => "ENDDEP",
        82 => "USE",
        83 => "STOP",
        84 => "STRIP",
        _ => "unknown",
    }
}

/// Get the name of a current-variable read
pub fn get_curvar_name(code: u32) -> &'static str {
    match code {
        1 => "PARAM",
        2 => "CURLOC",
        3 => "CURACT",
        4 => "CURVRB",
        5 => "CURINS",
        6 => "SCORE",
        7 => "MAXINSTANCE",
        _ => "unknown",
    }
}
